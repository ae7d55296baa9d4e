use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Every request, including dereference follow-ups, gives up after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("escat/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid host URL `{url}`: {reason}")]
    InvalidHost { url: String, reason: String },
    #[error("building HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("GET {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    pub status: u16,
    pub body: String,
    pub is_json: bool,
}

impl ResponseData {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct EsClient {
    host: String,
    http: Client,
    user: Option<String>,
    password: Option<String>,
}

impl EsClient {
    pub fn new(
        host: &str,
        user: Option<&str>,
        password: Option<&str>,
        insecure: bool,
    ) -> Result<Self, ClientError> {
        let trimmed = host.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ClientError::InvalidHost {
            url: host.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidHost {
                url: host.to_string(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            host: trimmed.to_string(),
            http,
            user: user.map(str::to_string),
            password: password.map(str::to_string),
        })
    }

    /// Issues a GET for `path_and_query`, which is appended verbatim to the host.
    ///
    /// Non-2xx answers are not errors: the cluster's error body is returned with
    /// its status so the caller can still print it.
    pub fn get(&self, path_and_query: &str) -> Result<ResponseData, ClientError> {
        let raw = format!("{}{}", self.host, path_and_query);
        let url = Url::parse(&raw).map_err(|e| ClientError::InvalidHost {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        debug!(%url, "GET");

        // No Accept header: the cat APIs would switch to JSON for it.
        let mut request = self.http.get(url);

        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request.send().map_err(|source| ClientError::Transport {
            url: raw.clone(),
            source,
        })?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_json_content_type)
            .unwrap_or(false);
        debug!(status, is_json, "response");

        let body = response
            .text()
            .map_err(|source| ClientError::Body { url: raw, source })?;

        Ok(ResponseData {
            status,
            body: ensure_trailing_newline(body),
            is_json,
        })
    }
}

fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

pub fn ensure_trailing_newline(mut body: String) -> String {
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body
}
