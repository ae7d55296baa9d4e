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

//! Dereference mode: replace a JSON listing with the full definition of each
//! listed item.
//!
//! Follow-up requests are issued one at a time, in listing order. The result
//! is a JSON array of the follow-up bodies, spliced together without being
//! re-parsed.

use crate::cat::CatRequest;
use crate::client::{ClientError, EsClient, ResponseData};
use crate::command::Command;
use serde_json::Value;
use tracing::{debug, warn};

/// How to turn one listing entry into a follow-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    /// Listing field holding the item identifier.
    pub field: &'static str,
    /// Path the identifier is appended to.
    pub prefix: String,
}

impl FollowUp {
    pub fn path(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

pub fn plan(command: Command, req: &CatRequest) -> Option<FollowUp> {
    let (field, prefix) = match command {
        Command::Snapshots => {
            let repository = req.target.as_deref().unwrap_or_default();
            ("id", format!("/_snapshot/{repository}/"))
        }
        Command::Repositories => ("id", "/_snapshot/".to_string()),
        Command::Templates => ("name", "/_template/".to_string()),
        Command::Indices => ("index", "/".to_string()),
        _ => return None,
    };
    Some(FollowUp { field, prefix })
}

/// Pulls `field` out of every entry of a JSON array listing.
///
/// A body that is not a JSON array yields no identifiers.
pub fn identifiers(body: &str, field: &str) -> Vec<String> {
    let entries = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(
                "expected a JSON array listing, got {}; nothing to dereference",
                kind(&other)
            );
            return Vec::new();
        }
        Err(err) => {
            warn!("listing is not valid JSON ({err}); nothing to dereference");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| match entry.get(field).and_then(Value::as_str) {
            Some(id) => Some(id.to_string()),
            None => {
                warn!("listing entry {idx} has no string `{field}`; skipping it");
                None
            }
        })
        .collect()
}

pub fn expand(
    client: &EsClient,
    listing: &ResponseData,
    follow_up: &FollowUp,
) -> Result<ResponseData, ClientError> {
    if !listing.is_success() {
        return Ok(listing.clone());
    }

    let ids = identifiers(&listing.body, follow_up.field);
    debug!(count = ids.len(), "dereferencing listing");

    let mut status = listing.status;
    let mut definitions = Vec::with_capacity(ids.len());
    for id in &ids {
        let response = client.get(&follow_up.path(id))?;
        if !response.is_success() && status == listing.status {
            status = response.status;
        }
        let definition = response.body.trim_end();
        if definition.is_empty() {
            warn!("`{id}` returned an empty definition; writing null");
            definitions.push("null".to_string());
        } else {
            definitions.push(definition.to_string());
        }
    }

    Ok(ResponseData {
        status,
        body: format!("[{}]\n", definitions.join(",")),
        is_json: true,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
