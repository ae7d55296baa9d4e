// escat - CLI for the Elasticsearch cat and cluster monitoring APIs
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::client::{ClientError, EsClient, ResponseData};
use crate::command::Command;
use crate::dereference;
use thiserror::Error;
use tracing::{debug, warn};

/// Positional token that switches a listing into dereference mode.
pub const DEREFERENCE_TOKEN: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatError {
    #[error("unexpected argument `{0}`; only `_` may follow the item name")]
    UnexpectedArgument(String),
}

/// Everything about one invocation that shapes the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatRequest {
    pub format: Format,
    pub verbose: bool,
    pub target: Option<String>,
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub dereference: bool,
}

impl CatRequest {
    pub fn from_positionals(
        json: bool,
        verbose: bool,
        fields: Option<String>,
        sort: Option<String>,
        target: Option<String>,
        trailing: Option<String>,
    ) -> Result<Self, CatError> {
        let mut dereference = match trailing {
            Some(token) if token == DEREFERENCE_TOKEN => true,
            Some(other) => return Err(CatError::UnexpectedArgument(other)),
            None => false,
        };

        let target = match non_blank(target) {
            Some(t) if t == DEREFERENCE_TOKEN => {
                dereference = true;
                None
            }
            other => other,
        };

        let format = if json || dereference {
            Format::Json
        } else {
            Format::Text
        };

        Ok(Self {
            format,
            verbose,
            target,
            fields: non_blank(fields),
            sort: non_blank(sort),
            dereference,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A request path plus its query fragments, joined verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<String>,
}

impl Endpoint {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    fn under(base: &str, target: Option<&str>) -> Self {
        match target {
            Some(target) => Self::new(format!("{base}/{target}")),
            None => Self::new(base),
        }
    }

    fn format(mut self, req: &CatRequest) -> Self {
        match req.format {
            Format::Json => self.query.push("format=json".into()),
            Format::Text if req.verbose => self.query.push("v".into()),
            Format::Text => {}
        }
        self
    }

    fn fields(mut self, req: &CatRequest) -> Self {
        if let Some(fields) = &req.fields {
            self.query.push(format!("h={fields}"));
        }
        self
    }

    fn sort(mut self, req: &CatRequest, default: &str) -> Self {
        let sort = req.sort.as_deref().unwrap_or(default);
        self.query.push(format!("s={sort}"));
        self
    }

    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.join("&"))
        }
    }
}

impl Command {
    pub fn endpoint(self, req: &CatRequest) -> Endpoint {
        let target = req.target.as_deref();
        match self {
            Command::Health => match req.format {
                Format::Json => Endpoint::new("/_cluster/health"),
                Format::Text => Endpoint::new("/_cat/health").format(req),
            },
            Command::Snapshots => {
                Endpoint::new(format!("/_cat/snapshots/{}", target.unwrap_or_default()))
                    .format(req)
            }
            Command::Allocation => Endpoint::new("/_cat/allocation").format(req),
            Command::Nodes => Endpoint::new("/_cat/nodes").format(req),
            Command::Plugins => Endpoint::new("/_cat/plugins").format(req),
            Command::Templates => Endpoint::under("/_cat/templates", target)
                .format(req)
                .sort(req, "n"),
            Command::Master => Endpoint::new("/_cat/master").format(req).fields(req),
            Command::Indices => Endpoint::under("/_cat/indices", target)
                .format(req)
                .fields(req)
                .sort(req, "i"),
            Command::Segments => Endpoint::under("/_cat/segments", target)
                .format(req)
                .fields(req)
                .sort(req, "i"),
            Command::Aliases => Endpoint::under("/_cat/aliases", target)
                .format(req)
                .fields(req)
                .sort(req, "a"),
            Command::Repositories => Endpoint::under("/_cat/repositories", target)
                .format(req)
                .fields(req),
            Command::Count => Endpoint::under("/_cat/count", target)
                .format(req)
                .fields(req),
            Command::Info => Endpoint::new("/"),
            Command::Role => Endpoint::under("/_xpack/security/role", target)
                .format(req)
                .fields(req),
            Command::User => Endpoint::under("/_xpack/security/user", target)
                .format(req)
                .fields(req),
        }
    }
}

/// Runs `command` against the cluster, following up on each listed item when
/// the request is in dereference mode.
pub fn execute(
    client: &EsClient,
    command: Command,
    req: &CatRequest,
) -> Result<ResponseData, ClientError> {
    if let Some(target) = req.target.as_deref().filter(|_| !command.takes_target()) {
        warn!("{command} takes no item name; ignoring `{target}`");
    }

    let endpoint = command.endpoint(req);
    debug!(%command, endpoint = %endpoint.path_and_query(), "running command");
    let listing = client.get(&endpoint.path_and_query())?;

    if !req.dereference {
        return Ok(listing);
    }

    match dereference::plan(command, req) {
        Some(follow_up) => dereference::expand(client, &listing, &follow_up),
        None => {
            warn!("{command} has no item definitions to fetch; printing the listing");
            Ok(listing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::COMMANDS;
    use httpmock::prelude::*;
    use serde_json::json;

    fn request(
        format: Format,
        verbose: bool,
        fields: Option<&str>,
        sort: Option<&str>,
    ) -> CatRequest {
        CatRequest {
            format,
            verbose,
            fields: fields.map(str::to_string),
            sort: sort.map(str::to_string),
            ..CatRequest::default()
        }
    }

    fn url(command: Command, req: &CatRequest) -> String {
        command.endpoint(req).path_and_query()
    }

    #[test]
    fn health_switches_api_by_format() {
        let text = request(Format::Text, false, None, None);
        let verbose = request(Format::Text, true, Some("status"), Some("status"));
        let json = request(Format::Json, true, Some("status"), Some("status"));

        assert_eq!(url(Command::Health, &text), "/_cat/health");
        assert_eq!(url(Command::Health, &verbose), "/_cat/health?v");
        assert_eq!(url(Command::Health, &json), "/_cluster/health");
    }

    #[test]
    fn format_only_commands_ignore_fields_and_sort() {
        for (command, path) in [
            (Command::Allocation, "/_cat/allocation"),
            (Command::Nodes, "/_cat/nodes"),
            (Command::Plugins, "/_cat/plugins"),
        ] {
            let plain = request(Format::Text, false, Some("a,b"), Some("a"));
            let verbose = request(Format::Text, true, Some("a,b"), Some("a"));
            let json = request(Format::Json, true, Some("a,b"), Some("a"));

            assert_eq!(url(command, &plain), path);
            assert_eq!(url(command, &verbose), format!("{path}?v"));
            assert_eq!(url(command, &json), format!("{path}?format=json"));
        }
    }

    #[test]
    fn snapshots_always_keep_the_repository_slot() {
        let mut req = request(Format::Text, false, None, Some("id"));
        assert_eq!(url(Command::Snapshots, &req), "/_cat/snapshots/");

        req.target = Some("backups".into());
        assert_eq!(url(Command::Snapshots, &req), "/_cat/snapshots/backups");

        req.verbose = true;
        assert_eq!(url(Command::Snapshots, &req), "/_cat/snapshots/backups?v");

        req.format = Format::Json;
        assert_eq!(
            url(Command::Snapshots, &req),
            "/_cat/snapshots/backups?format=json"
        );
    }

    #[test]
    fn templates_sort_by_name_unless_told_otherwise() {
        let mut req = request(Format::Text, false, Some("name"), None);
        assert_eq!(url(Command::Templates, &req), "/_cat/templates?s=n");

        req.target = Some("logs*".into());
        req.verbose = true;
        assert_eq!(url(Command::Templates, &req), "/_cat/templates/logs*?v&s=n");

        req.format = Format::Json;
        req.sort = Some("order:desc".into());
        assert_eq!(
            url(Command::Templates, &req),
            "/_cat/templates/logs*?format=json&s=order:desc"
        );
    }

    #[test]
    fn master_takes_fields_but_no_sort() {
        let req = request(Format::Text, true, Some("id,node"), Some("node"));
        assert_eq!(url(Command::Master, &req), "/_cat/master?v&h=id,node");

        let req = request(Format::Json, false, None, None);
        assert_eq!(url(Command::Master, &req), "/_cat/master?format=json");
    }

    #[test]
    fn sorted_listings_apply_their_default_sort() {
        for (command, base, default) in [
            (Command::Indices, "/_cat/indices", "i"),
            (Command::Segments, "/_cat/segments", "i"),
            (Command::Aliases, "/_cat/aliases", "a"),
        ] {
            let plain = request(Format::Text, false, None, None);
            assert_eq!(url(command, &plain), format!("{base}?s={default}"));

            let mut full = request(Format::Text, true, Some("index,health"), Some("docs.count:desc"));
            full.target = Some("logs-*".into());
            assert_eq!(
                url(command, &full),
                format!("{base}/logs-*?v&h=index,health&s=docs.count:desc")
            );

            let json = request(Format::Json, true, Some("index"), None);
            assert_eq!(
                url(command, &json),
                format!("{base}?format=json&h=index&s={default}")
            );
        }
    }

    #[test]
    fn field_listings_have_no_sort() {
        for (command, base) in [
            (Command::Repositories, "/_cat/repositories"),
            (Command::Count, "/_cat/count"),
            (Command::Role, "/_xpack/security/role"),
            (Command::User, "/_xpack/security/user"),
        ] {
            let plain = request(Format::Text, false, None, Some("x"));
            assert_eq!(url(command, &plain), base);

            let mut full = request(Format::Text, true, Some("id,type"), Some("x"));
            full.target = Some("item".into());
            assert_eq!(url(command, &full), format!("{base}/item?v&h=id,type"));

            let json = request(Format::Json, false, Some("id"), None);
            assert_eq!(url(command, &json), format!("{base}?format=json&h=id"));
        }
    }

    #[test]
    fn info_is_the_root_path() {
        let req = request(Format::Json, true, Some("name"), Some("name"));
        assert_eq!(url(Command::Info, &req), "/");
    }

    #[test]
    fn every_command_builds_an_absolute_path() {
        let req = request(Format::Text, false, None, None);
        for spec in COMMANDS {
            assert!(spec.command.endpoint(&req).path.starts_with('/'));
        }
    }

    #[test]
    fn underscore_target_means_dereference() {
        let req = CatRequest::from_positionals(false, true, None, None, Some("_".into()), None)
            .unwrap();
        assert!(req.dereference);
        assert_eq!(req.target, None);
        assert_eq!(req.format, Format::Json);
    }

    #[test]
    fn trailing_underscore_means_dereference() {
        let req = CatRequest::from_positionals(
            false,
            false,
            None,
            None,
            Some("backups".into()),
            Some("_".into()),
        )
        .unwrap();
        assert!(req.dereference);
        assert_eq!(req.target.as_deref(), Some("backups"));
        assert_eq!(req.format, Format::Json);
    }

    #[test]
    fn other_trailing_tokens_are_rejected() {
        let err = CatRequest::from_positionals(
            false,
            false,
            None,
            None,
            Some("backups".into()),
            Some("extra".into()),
        )
        .unwrap_err();
        assert_eq!(err, CatError::UnexpectedArgument("extra".into()));
    }

    #[test]
    fn blank_options_are_dropped() {
        let req = CatRequest::from_positionals(
            true,
            false,
            Some("".into()),
            Some("  ".into()),
            Some("".into()),
            None,
        )
        .unwrap();
        assert_eq!(req.fields, None);
        assert_eq!(req.sort, None);
        assert_eq!(req.target, None);
        assert!(!req.dereference);
        assert_eq!(req.format, Format::Json);
    }

    #[test]
    fn execute_without_dereference_returns_the_listing() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/_cat/nodes").query_param_exists("v");
            then.status(200).body("ip heap.percent\n127.0.0.1 42\n");
        });

        let client = EsClient::new(&server.base_url(), None, None, false).unwrap();
        let req = request(Format::Text, true, None, None);
        let response = execute(&client, Command::Nodes, &req).unwrap();

        mock.assert();
        assert_eq!(response.body, "ip heap.percent\n127.0.0.1 42\n");
    }

    #[test]
    fn execute_dereferences_indices() {
        let server = MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(GET)
                .path("/_cat/indices/logs")
                .query_param("format", "json")
                .query_param("s", "i");
            then.status(200)
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(json!([{"index": "logs-a"}, {"index": "logs-b"}]));
        });
        let first = server.mock(|when, then| {
            when.method(GET).path("/logs-a");
            then.status(200)
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(json!({"logs-a": {}}));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/logs-b");
            then.status(200)
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(json!({"logs-b": {}}));
        });

        let client = EsClient::new(&server.base_url(), None, None, false).unwrap();
        let req = CatRequest::from_positionals(
            false,
            false,
            None,
            None,
            Some("logs".into()),
            Some("_".into()),
        )
        .unwrap();
        let response = execute(&client, Command::Indices, &req).unwrap();

        listing.assert();
        first.assert();
        second.assert();
        let value: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(value, json!([{"logs-a": {}}, {"logs-b": {}}]));
    }

    #[test]
    fn execute_dereference_on_plain_command_returns_json_listing() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/_cat/allocation")
                .query_param("format", "json");
            then.status(200)
                .header("content-type", "application/json; charset=UTF-8")
                .json_body(json!([{"node": "n1"}]));
        });

        let client = EsClient::new(&server.base_url(), None, None, false).unwrap();
        let req = CatRequest::from_positionals(false, false, None, None, Some("_".into()), None)
            .unwrap();
        let response = execute(&client, Command::Allocation, &req).unwrap();

        mock.assert();
        assert!(response.is_json);
        assert_eq!(response.body, "[{\"node\":\"n1\"}]\n");
    }
}
