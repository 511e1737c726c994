//! Session configuration.

use crate::pacing::{DEFAULT_PACING_INTERVAL, DEFAULT_RATE_LIMIT_BACKOFF};
use crate::session::SessionError;
use std::time::Duration;

pub use guppshupp::BASE_URL_ENV;

/// Environment variable overriding the pacing interval, in milliseconds.
pub const PACING_ENV: &str = "GUPPSHUPP_PACING_MS";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for creating a new session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the memory service.
    pub base_url: String,

    /// Minimum wait between consecutive generation calls.
    pub pacing_interval: Duration,

    /// Multiplier applied to the pacing interval after a 429.
    pub rate_limit_backoff: u32,

    /// Timeout for a whole request.
    pub request_timeout: Duration,

    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Create a config for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            pacing_interval: DEFAULT_PACING_INTERVAL,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Build a config from `GUPPSHUPP_API_URL` and `GUPPSHUPP_PACING_MS`.
    ///
    /// Unset variables fall back to the defaults; a pacing value that is
    /// not a whole number of milliseconds is an error.
    pub fn from_env() -> Result<Self, SessionError> {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var(PACING_ENV) {
            config.pacing_interval = parse_millis(&raw)?;
        }
        Ok(config)
    }

    /// Set the pacing interval.
    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    /// Set the backoff multiplier used after a rate-limited call.
    pub fn with_rate_limit_backoff(mut self, factor: u32) -> Self {
        self.rate_limit_backoff = factor;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn parse_millis(raw: &str) -> Result<Duration, SessionError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| SessionError::Config(format!("{PACING_ENV}='{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pacing_interval, Duration::from_secs(4));
        assert_eq!(config.rate_limit_backoff, DEFAULT_RATE_LIMIT_BACKOFF);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new("https://memory.example.com")
            .with_pacing_interval(Duration::from_millis(250))
            .with_rate_limit_backoff(2)
            .with_request_timeout(Duration::from_secs(10))
            .with_connect_timeout(Duration::from_secs(2));

        assert_eq!(config.base_url, "https://memory.example.com");
        assert_eq!(config.pacing_interval, Duration::from_millis(250));
        assert_eq!(config.rate_limit_backoff, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis("1500").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_millis(" 0 ").unwrap(), Duration::ZERO);
        assert!(matches!(parse_millis("4s"), Err(SessionError::Config(_))));
    }
}
