//! Dependency initialization and wiring for the search client.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::ClientError;
use search_client_repository::{
    ConnectionConfig, IndexTarget, RetryPolicy, SearchConnection, TracingSink,
};

/// Default number of retries for transient faults.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry, in milliseconds.
const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 100;

/// Default cap on the retry delay, in milliseconds.
const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Default request timeout, in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Container for the settings a connection is built from.
#[derive(Debug, Clone)]
pub struct Dependencies {
    /// Connection settings.
    pub config: ConnectionConfig,
}

impl Dependencies {
    /// Initialize from environment variables, after loading `.env` if present.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_SERVICE_NAME`: service name or URL (required)
    /// - `SEARCH_SERVICE_KEY`: service key (required)
    /// - `SEARCH_INDEX_NAME`: index bound to the first document type used (required)
    /// - `SEARCH_MAX_RETRIES`: retries for transient faults, `0` disables (default: 3)
    /// - `SEARCH_INITIAL_RETRY_DELAY_MS`: first retry delay (default: 100)
    /// - `SEARCH_MAX_RETRY_DELAY_MS`: retry delay cap (default: 5000)
    /// - `SEARCH_REQUEST_TIMEOUT_MS`: request timeout (default: 30000)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Parsed settings
    /// * `Err(ClientError)` - If a required variable is missing or a number is invalid
    pub fn from_env() -> Result<Self, ClientError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Initialize from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = required(&lookup, "SEARCH_SERVICE_NAME")?;
        let service_key = required(&lookup, "SEARCH_SERVICE_KEY")?;
        let index_name = required(&lookup, "SEARCH_INDEX_NAME")?;

        let max_retries = parsed(&lookup, "SEARCH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let initial_delay = parsed(
            &lookup,
            "SEARCH_INITIAL_RETRY_DELAY_MS",
            DEFAULT_INITIAL_RETRY_DELAY_MS,
        )?;
        let max_delay = parsed(&lookup, "SEARCH_MAX_RETRY_DELAY_MS", DEFAULT_MAX_RETRY_DELAY_MS)?;
        let timeout = parsed(&lookup, "SEARCH_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        let mut config =
            ConnectionConfig::new(service_name, service_key, IndexTarget::Single(index_name))?
                .with_request_timeout(Duration::from_millis(timeout));

        if max_retries > 0 {
            config = config.with_retry(RetryPolicy::new(
                max_retries,
                Duration::from_millis(initial_delay),
                Duration::from_millis(max_delay),
            ));
        }

        info!(
            service = %config.service_name,
            max_retries = max_retries,
            timeout_ms = timeout,
            "Loaded search client configuration"
        );

        Ok(Self { config })
    }

    /// Build a connection that reports diagnostics through `tracing`.
    pub fn connect(&self) -> Result<SearchConnection, ClientError> {
        let connection = SearchConnection::new(self.config.clone())?;
        Ok(connection.with_sink(Arc::new(TracingSink)))
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ClientError::config(format!("{} is required", key)))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ClientError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ClientError::config(format!("Invalid {}: {}", key, e))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SEARCH_SERVICE_NAME", "http://localhost:9200"),
        ("SEARCH_SERVICE_KEY", "secret"),
        ("SEARCH_INDEX_NAME", "hotels"),
    ];

    #[test]
    fn test_defaults() {
        let deps = Dependencies::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(deps.config.service_name, "http://localhost:9200");
        assert_eq!(deps.config.target, IndexTarget::Single("hotels".to_string()));
        assert_eq!(deps.config.request_timeout, Duration::from_secs(30));

        let retry = deps.config.retry.unwrap();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
        assert_eq!(retry.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SEARCH_MAX_RETRIES", "0"));
        vars.push(("SEARCH_REQUEST_TIMEOUT_MS", "1500"));

        let deps = Dependencies::from_lookup(lookup(&vars)).unwrap();

        assert!(deps.config.retry.is_none());
        assert_eq!(deps.config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_missing_required() {
        let result = Dependencies::from_lookup(lookup(&REQUIRED[..2]));

        match result {
            Err(ClientError::ConfigError(msg)) => assert!(msg.contains("SEARCH_INDEX_NAME")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SEARCH_MAX_RETRIES", "many"));

        assert!(matches!(
            Dependencies::from_lookup(lookup(&vars)),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let deps = Dependencies::from_lookup(lookup(&REQUIRED)).unwrap();

        let connection = deps.connect().unwrap();
        assert_eq!(connection.config().service_name, "http://localhost:9200");
        assert!(!connection.is_disposed());
    }
}
