use std::{fmt, path::PathBuf, str::FromStr};

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_API_PREFIX: &str = "/api/insights-results-aggregator/v2/";
pub const DEFAULT_DATA_DIR: &str = "data";
const MAX_DEFAULT_HTTP_WORKERS: usize = 32;

const BIND_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_BIND",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__ADDRESS",
);
const API_PREFIX_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_API_PREFIX",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__API_PREFIX",
);
const DATA_DIR_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_DATA_DIR",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__CONTENT__PATH",
);
const HTTP_WORKERS_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_HTTP_WORKERS",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__HTTP_WORKERS",
);
const TRANSPORT_RUNTIME_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_TRANSPORT_RUNTIME",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__TRANSPORT_RUNTIME",
);
const DEBUG_KEYS: (&str, &str) = (
    "AGGREGATOR_MOCK_DEBUG",
    "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__DEBUG",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRuntime {
    Std,
    Axum,
}

impl TransportRuntime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Std => "std",
            Self::Axum => "axum",
        }
    }
}

impl fmt::Display for TransportRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportRuntime {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "std" => Ok(Self::Std),
            "axum" => Ok(Self::Axum),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidWorkerCount { key: &'static str, value: String },
    #[error("{key} must be a boolean (true/false/1/0), got '{value}'")]
    InvalidFlag { key: &'static str, value: String },
    #[error("{key} must be 'std' or 'axum', got '{value}'")]
    UnknownTransportRuntime { key: &'static str, value: String },
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConfig {
    pub bind_addr: String,
    pub api_prefix: String,
    pub data_dir: PathBuf,
    pub http_workers: usize,
    pub transport_runtime: TransportRuntime,
    pub debug: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            http_workers: default_http_workers(),
            transport_runtime: TransportRuntime::Std,
            debug: false,
        }
    }
}

impl MockConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which maps an environment key
    /// to its value. The primary key of every setting wins over its legacy
    /// fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some((key, value)) = lookup_with_fallback(&lookup, BIND_KEYS) {
            config.bind_addr = non_empty(key, value)?;
        }
        if let Some((key, value)) = lookup_with_fallback(&lookup, API_PREFIX_KEYS) {
            config.api_prefix = normalize_api_prefix(&non_empty(key, value)?);
        }
        if let Some((key, value)) = lookup_with_fallback(&lookup, DATA_DIR_KEYS) {
            config.data_dir = PathBuf::from(non_empty(key, value)?);
        }
        if let Some((key, value)) = lookup_with_fallback(&lookup, HTTP_WORKERS_KEYS) {
            config.http_workers = match value.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => workers,
                _ => return Err(ConfigError::InvalidWorkerCount { key, value }),
            };
        }
        if let Some((key, value)) = lookup_with_fallback(&lookup, TRANSPORT_RUNTIME_KEYS) {
            config.transport_runtime = value
                .parse()
                .map_err(|()| ConfigError::UnknownTransportRuntime { key, value })?;
        }
        if let Some((key, value)) = lookup_with_fallback(&lookup, DEBUG_KEYS) {
            config.debug = parse_flag(&value).ok_or(ConfigError::InvalidFlag { key, value })?;
        }

        Ok(config)
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

/// Ensures the prefix starts and ends with a single `/`.
pub fn normalize_api_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

pub fn default_http_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
        .clamp(1, MAX_DEFAULT_HTTP_WORKERS)
}

fn lookup_with_fallback<F>(
    lookup: &F,
    (primary, fallback): (&'static str, &'static str),
) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(primary)
        .map(|value| (primary, value))
        .or_else(|| lookup(fallback).map(|value| (fallback, value)))
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(value.trim().to_string())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<MockConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        MockConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.transport_runtime, TransportRuntime::Std);
        assert!(!config.debug);
        assert!((1..=MAX_DEFAULT_HTTP_WORKERS).contains(&config.http_workers));
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn primary_keys_win_over_legacy_fallbacks() {
        let config = config_from(&[
            ("AGGREGATOR_MOCK_BIND", "0.0.0.0:9000"),
            ("INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__ADDRESS", ":8080"),
            ("INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__API_PREFIX", "api/v1"),
            ("AGGREGATOR_MOCK_HTTP_WORKERS", "3"),
            ("AGGREGATOR_MOCK_TRANSPORT_RUNTIME", "AXUM"),
            ("INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__DEBUG", "true"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.api_prefix, "/api/v1/");
        assert_eq!(config.http_workers, 3);
        assert_eq!(config.transport_runtime, TransportRuntime::Axum);
        assert!(config.debug);
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        assert_eq!(
            config_from(&[("AGGREGATOR_MOCK_HTTP_WORKERS", "0")]),
            Err(ConfigError::InvalidWorkerCount {
                key: "AGGREGATOR_MOCK_HTTP_WORKERS",
                value: "0".to_string(),
            })
        );
        assert!(matches!(
            config_from(&[("AGGREGATOR_MOCK_HTTP_WORKERS", "many")]),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
        assert!(matches!(
            config_from(&[("INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__DEBUG", "maybe")]),
            Err(ConfigError::InvalidFlag {
                key: "INSIGHTS_RESULTS_AGGREGATOR_MOCK__SERVER__DEBUG",
                ..
            })
        ));
        assert!(matches!(
            config_from(&[("AGGREGATOR_MOCK_TRANSPORT_RUNTIME", "hyper")]),
            Err(ConfigError::UnknownTransportRuntime { .. })
        ));
        assert_eq!(
            config_from(&[("AGGREGATOR_MOCK_DATA_DIR", "  ")]),
            Err(ConfigError::Empty {
                key: "AGGREGATOR_MOCK_DATA_DIR"
            })
        );
    }

    #[test]
    fn api_prefix_is_normalized() {
        assert_eq!(normalize_api_prefix("api/v2"), "/api/v2/");
        assert_eq!(normalize_api_prefix("/api/v2/"), "/api/v2/");
        assert_eq!(normalize_api_prefix("//api//"), "/api/");
        assert_eq!(normalize_api_prefix("/"), "/");
    }
}
