//! Runtime configuration, built once at startup and passed by reference.
//! Defaults align with a local PostgreSQL and the Sportradar trial tier.

use std::time::Duration;
use std::{fs, path::Path};

use crate::client::Resource;

pub const DEFAULT_API_BASE_URL: &str = "https://api.sportradar.com/tennis/trial/v3/en";
pub const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 3600;
const API_KEY_FILE: &str = "api_key.txt";

#[derive(Debug, Clone)]
pub struct Config {
    /// Either a `postgres://` URL or a libpq key/value string.
    pub database_url: String,
    pub api_key: String,
    pub api_base_url: String,
    /// Flows to run, always in pipeline order.
    pub flows: Vec<Resource>,
    pub run_migrations: bool,
    /// How long dashboard query results are reused.
    pub query_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => database_url_from_parts(
                &env_or("DB_HOST", "localhost"),
                &env_or("DB_PORT", "5432"),
                &env_or("DB_NAME", "tennis"),
                &env_or("DB_USER", "postgres"),
                &env_or("DB_PASSWORD", "postgres"),
            ),
        };

        // Prefer env var; fallback to api_key.txt in working directory
        let api_key = match std::env::var("SPORTRADAR_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => match fs::read_to_string(Path::new(API_KEY_FILE)) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => {
                    return Err(format!(
                        "Missing API key: set SPORTRADAR_API_KEY or provide {} in working directory",
                        API_KEY_FILE
                    ));
                }
            },
        };

        let api_base_url = env_or("SPORTRADAR_BASE_URL", DEFAULT_API_BASE_URL);

        let flows = match std::env::var("INGEST_FLOWS") {
            Ok(s) if !s.trim().is_empty() => parse_flows(&s)?,
            _ => Resource::ALL.to_vec(),
        };

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .ok()
            .map(|s| matches!(s.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(true);

        let ttl_secs = match std::env::var("QUERY_CACHE_TTL_SECS") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u64>()
                .map_err(|_| "QUERY_CACHE_TTL_SECS must be a whole number of seconds".to_string())?,
            _ => DEFAULT_QUERY_CACHE_TTL_SECS,
        };

        Ok(Config {
            database_url,
            api_key,
            api_base_url,
            flows,
            run_migrations,
            query_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }

    #[cfg(test)]
    pub fn for_tests(database_url: &str, api_key: &str) -> Self {
        Config {
            database_url: database_url.to_string(),
            api_key: api_key.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            flows: Resource::ALL.to_vec(),
            run_migrations: false,
            query_cache_ttl: Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// libpq key/value form, so passwords with `@` or `/` need no URL encoding.
pub fn database_url_from_parts(host: &str, port: &str, dbname: &str, user: &str, password: &str) -> String {
    [
        ("host", host),
        ("port", port),
        ("dbname", dbname),
        ("user", user),
        ("password", password),
    ]
    .iter()
    .map(|(k, v)| format!("{}={}", k, quote_conninfo(v)))
    .collect::<Vec<_>>()
    .join(" ")
}

fn quote_conninfo(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Comma-separated flow names; order in the input does not matter.
pub fn parse_flows(raw: &str) -> Result<Vec<Resource>, String> {
    let mut wanted = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let flow = match name.to_ascii_lowercase().as_str() {
            "competitions" => Resource::Competitions,
            "complexes" => Resource::Complexes,
            "rankings" => Resource::DoublesRankings,
            other => {
                return Err(format!(
                    "INGEST_FLOWS: unknown flow '{}' (expected competitions, complexes, rankings)",
                    other
                ));
            }
        };
        wanted.push(flow);
    }
    if wanted.is_empty() {
        return Err("INGEST_FLOWS names no flows".to_string());
    }
    Ok(Resource::ALL.into_iter().filter(|r| wanted.contains(r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conninfo_quotes_awkward_passwords() {
        let url = database_url_from_parts("localhost", "5432", "tennis", "postgres", "Pa@ss w'rd");
        assert_eq!(
            url,
            r"host='localhost' port='5432' dbname='tennis' user='postgres' password='Pa@ss w\'rd'"
        );
    }

    #[test]
    fn flows_keep_pipeline_order() {
        let flows = parse_flows("rankings, competitions").unwrap();
        assert_eq!(flows, vec![Resource::Competitions, Resource::DoublesRankings]);
        assert_eq!(parse_flows("COMPLEXES").unwrap(), vec![Resource::Complexes]);
    }

    #[test]
    fn unknown_or_empty_flows_are_rejected() {
        assert!(parse_flows("venues").unwrap_err().contains("venues"));
        assert!(parse_flows(" , ").is_err());
    }
}
