//! Blocking HTTP client for the Sportradar tennis v3 feeds.
//!
//! - Blocking client using `ureq` (no async).
//! - One GET per resource, no retries, no pagination.
//! - The API key travels as the `api_key` query parameter and is redacted from logs.
//!
//! A body that is not JSON is a [`SourceError::Decode`]. A body that is JSON but
//! lacks the expected top-level array is logged and yields an empty listing.

use http::StatusCode;
use log::{debug, info, warn};
use serde_json::Value;
use std::fmt::{Display, Formatter};

use crate::config::Config;

const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;
const BODY_EXCERPT_CHARS: usize = 512;

/// The three feeds the pipeline ingests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Competitions,
    Complexes,
    DoublesRankings,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Competitions, Resource::Complexes, Resource::DoublesRankings];

    pub fn path(self) -> &'static str {
        match self {
            Resource::Competitions => "competitions.json",
            Resource::Complexes => "complexes.json",
            Resource::DoublesRankings => "double_competitors_rankings.json",
        }
    }

    /// Top-level key holding the listing.
    pub fn listing_key(self) -> &'static str {
        match self {
            Resource::Competitions => "competitions",
            Resource::Complexes => "complexes",
            Resource::DoublesRankings => "rankings",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.listing_key())
    }
}

#[derive(Debug)]
pub enum SourceError {
    /// Network-level failure (DNS, TLS, connection reset, body read).
    Transport(String),
    /// Non-2xx response.
    Http { status: u16, message: String },
    /// Body is not valid JSON. `path` is empty when the failure is at the root.
    Decode { path: String, message: String },
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Transport(s) => write!(f, "transport error: {}", s),
            SourceError::Http { status, message } => {
                let reason = StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("");
                write!(f, "http {} {}: {}", status, reason, message)
            }
            SourceError::Decode { path, message } if path.is_empty() => write!(f, "decode error: {}", message),
            SourceError::Decode { path, message } => write!(f, "decode error at {}: {}", path, message),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<serde_path_to_error::Error<serde_json::Error>> for SourceError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = value.path().to_string();
        SourceError::Decode {
            path: if path == "." || path == "?" { String::new() } else { path },
            message: value.into_inner().to_string(),
        }
    }
}

/// Where the pipeline gets its listings from.
pub trait TennisSource {
    fn fetch(&self, resource: Resource) -> Result<Vec<Value>, SourceError>;
}

pub struct SportradarClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl SportradarClient {
    pub fn new(cfg: &Config) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        SportradarClient {
            agent,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn url(&self, resource: Resource) -> String {
        format!("{}/{}", self.base_url, resource.path())
    }

    fn get_body(&self, resource: Resource) -> Result<String, SourceError> {
        let url = self.url(resource);
        info!("Fetching {} from {}?api_key=<redacted>", resource, url);

        let mut res = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .query("api_key", &self.api_key)
            .call()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status: StatusCode = res.status();
        let body = res
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string();

        if !status.is_success() {
            let message = body
                .map(|b| excerpt(&b))
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(SourceError::Http {
                status: status.as_u16(),
                message,
            });
        }
        body.map_err(|e| SourceError::Transport(e.to_string()))
    }
}

impl TennisSource for SportradarClient {
    fn fetch(&self, resource: Resource) -> Result<Vec<Value>, SourceError> {
        let body = self.get_body(resource)?;
        debug!("{}: received {} byte(s)", resource, body.len());
        let items = parse_listing(&body, resource.listing_key())?;
        info!("{}: {} record(s) in listing", resource, items.len());
        Ok(items)
    }
}

/// Parse a response body and take the array stored under `key`.
pub fn parse_listing(body: &str, key: &str) -> Result<Vec<Value>, SourceError> {
    let mut de = serde_json::Deserializer::from_str(body);
    let root: Value = serde_path_to_error::deserialize(&mut de)?;
    // trailing garbage after the document is malformed JSON too
    de.end().map_err(|e| SourceError::Decode {
        path: String::new(),
        message: e.to_string(),
    })?;
    Ok(take_listing(root, key))
}

/// Shape check: a missing key or a non-array value is not an error.
fn take_listing(root: Value, key: &str) -> Vec<Value> {
    match root {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!(
                    "Response key '{}' is {} instead of an array; nothing to ingest",
                    key,
                    json_kind(&other)
                );
                Vec::new()
            }
            None => {
                warn!("Response has no '{}' key; nothing to ingest", key);
                Vec::new()
            }
        },
        other => {
            warn!("Response is {} instead of an object; nothing to ingest", json_kind(&other));
            Vec::new()
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one request on a loopback port; the handle yields the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (SportradarClient, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut cfg = Config::for_tests("postgres://localhost/tennis", "K3Y");
        cfg.api_base_url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            request_line.trim_end().to_string()
        });
        (SportradarClient::new(&cfg), handle)
    }

    #[test]
    fn key_travels_as_query_parameter() {
        let (client, server) = serve_once("200 OK", r#"{"complexes":[{"id":"sr:complex:705"}]}"#);
        let items = client.fetch(Resource::Complexes).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(server.join().unwrap(), "GET /complexes.json?api_key=K3Y HTTP/1.1");
    }

    #[test]
    fn non_success_status_is_an_http_error() {
        let (client, server) = serve_once("503 Service Unavailable", "busy");
        let err = client.fetch(Resource::Complexes).unwrap_err();
        server.join().unwrap();
        assert!(
            matches!(err, SourceError::Http { status: 503, ref message } if message == "busy"),
            "{err}"
        );
        assert_eq!(err.to_string(), "http 503 Service Unavailable: busy");
    }

    #[test]
    fn wrong_shape_over_the_wire_is_an_empty_listing() {
        let (client, server) = serve_once("200 OK", r#"{"rankings":"nope"}"#);
        assert!(client.fetch(Resource::DoublesRankings).unwrap().is_empty());
        server.join().unwrap();
    }

    #[test]
    fn invalid_json_over_the_wire_is_a_decode_error() {
        let (client, server) = serve_once("200 OK", "{oops");
        let err = client.fetch(Resource::Competitions).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, SourceError::Decode { .. }), "{err}");
    }

    #[test]
    fn resource_paths_and_keys() {
        assert_eq!(Resource::Competitions.path(), "competitions.json");
        assert_eq!(Resource::Complexes.listing_key(), "complexes");
        assert_eq!(Resource::DoublesRankings.path(), "double_competitors_rankings.json");
        assert_eq!(Resource::DoublesRankings.listing_key(), "rankings");
    }

    #[test]
    fn listing_is_taken_from_key() {
        let items = parse_listing(r#"{"generated_at":"x","competitions":[{"id":"a"},{"id":"b"}]}"#, "competitions")
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["id"], "b");
    }

    #[test]
    fn missing_or_mistyped_key_yields_empty_listing() {
        assert!(parse_listing(r#"{"other":[]}"#, "complexes").unwrap().is_empty());
        assert!(parse_listing(r#"{"complexes":{"id":"x"}}"#, "complexes").unwrap().is_empty());
        assert!(parse_listing(r#"[1,2,3]"#, "complexes").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = parse_listing(r#"{"rankings": [ {"rank": 1 }"#, "rankings").unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }), "{err}");
        let err = parse_listing(r#"{"rankings": []} trailing"#, "rankings").unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }), "{err}");
    }

    #[test]
    fn root_decode_errors_have_no_path() {
        let err = parse_listing("{oops", "rankings").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("decode error: "), "{msg}");
        assert!(!msg.contains(" at ?"), "{msg}");
    }

    #[test]
    fn url_never_embeds_the_key() {
        let cfg = Config::for_tests("postgres://localhost/tennis", "secret-key");
        let client = SportradarClient::new(&cfg);
        let url = client.url(Resource::Complexes);
        assert_eq!(url, "https://api.sportradar.com/tennis/trial/v3/en/complexes.json");
        assert!(!url.contains("secret-key"));
    }

    #[test]
    fn long_bodies_are_truncated_in_errors() {
        let body = "x".repeat(BODY_EXCERPT_CHARS + 10);
        let short = excerpt(&body);
        assert_eq!(short.chars().count(), BODY_EXCERPT_CHARS + 1);
        assert_eq!(excerpt("  not found \n"), "not found");
    }
}
