//! Monitor configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `QMON_*` environment variables. Command-line flags are applied on top by
//! the binary.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// IBM Quantum Cloud v1 API root.
pub const DEFAULT_API_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api/v1";

/// IBM Cloud IAM token endpoint.
pub const DEFAULT_IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Lowest poll interval the scheduler will honour.
pub const MIN_POLL_INTERVAL_MS: u64 = 5_000;

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

/// Interval choices offered to users.
pub const POLL_PRESETS_MS: [u64; 5] = [5_000, 10_000, 15_000, 30_000, 60_000];

/// Clamp a requested poll interval to the allowed floor.
pub fn clamp_poll_interval(requested_ms: u64) -> Duration {
    Duration::from_millis(requested_ms.max(MIN_POLL_INTERVAL_MS))
}

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Provider API root (no trailing slash needed).
    pub api_endpoint: String,
    /// IAM token exchange URL.
    pub iam_token_url: String,
    /// Job poll interval in milliseconds (clamped to 5000 by the scheduler).
    pub poll_interval_ms: u64,
    /// Jobs requested per collection.
    pub jobs_limit: usize,
    /// Maximum number of backends whose status is fetched.
    pub backend_cap: usize,
    /// Concurrent backend status requests (1 = sequential).
    pub backend_concurrency: usize,
    /// Entries in the queue-depth chart.
    pub chart_limit: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Refresh a bearer token this many seconds before it expires.
    pub token_refresh_buffer_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            iam_token_url: DEFAULT_IAM_TOKEN_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            jobs_limit: 200,
            backend_cap: 24,
            backend_concurrency: 1,
            chart_limit: crate::view::DEFAULT_CHART_LIMIT,
            request_timeout_secs: 60,
            token_refresh_buffer_secs: 300,
        }
    }
}

impl MonitorConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(source: &str) -> CoreResult<Self> {
        let config: Self = serde_yaml_ng::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&source)
    }

    /// Apply `QMON_API_ENDPOINT`, `QMON_IAM_URL` and `QMON_POLL_MS` overrides.
    pub fn with_env_overrides(mut self) -> CoreResult<Self> {
        if let Ok(endpoint) = std::env::var("QMON_API_ENDPOINT") {
            self.api_endpoint = endpoint;
        }
        if let Ok(url) = std::env::var("QMON_IAM_URL") {
            self.iam_token_url = url;
        }
        if let Ok(ms) = std::env::var("QMON_POLL_MS") {
            self.poll_interval_ms = ms
                .parse()
                .map_err(|e| CoreError::InvalidConfig(format!("QMON_POLL_MS '{ms}': {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the monitor cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, url) in [
            ("api_endpoint", &self.api_endpoint),
            ("iam_token_url", &self.iam_token_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        for (name, value) in [
            ("jobs_limit", self.jobs_limit),
            ("backend_cap", self.backend_cap),
            ("backend_concurrency", self.backend_concurrency),
        ] {
            if value == 0 {
                return Err(CoreError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Effective poll interval after clamping.
    pub fn poll_interval(&self) -> Duration {
        clamp_poll_interval(self.poll_interval_ms)
    }

    /// Request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.jobs_limit, 200);
        assert_eq!(config.backend_cap, 24);
        assert_eq!(config.chart_limit, 12);
        assert_eq!(config.poll_interval(), Duration::from_millis(15_000));
    }

    #[test]
    fn test_clamp_poll_interval() {
        assert_eq!(clamp_poll_interval(2_000), Duration::from_millis(5_000));
        assert_eq!(clamp_poll_interval(0), Duration::from_millis(5_000));
        assert_eq!(clamp_poll_interval(30_000), Duration::from_millis(30_000));
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = MonitorConfig::from_yaml("poll_interval_ms: 30000\nbackend_concurrency: 4\n")
            .unwrap();
        assert_eq!(config.poll_interval_ms, 30_000);
        assert_eq!(config.backend_concurrency, 4);
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_yaml_rejects_zero_limit() {
        let err = MonitorConfig::from_yaml("jobs_limit: 0\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = MonitorConfig {
            api_endpoint: "ftp://example.com".into(),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qmon.yaml");
        std::fs::write(&path, "chart_limit: 5\n").unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.chart_limit, 5);
    }

    #[test]
    fn test_presets_respect_floor() {
        assert!(POLL_PRESETS_MS.iter().all(|ms| *ms >= MIN_POLL_INTERVAL_MS));
    }
}
