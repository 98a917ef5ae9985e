//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the request pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the backend (e.g. `https://api.example.com`)
    pub base_url: String,

    /// Optional environment suffix inserted between base URL and endpoint
    /// path for requests with `use_suffix` set (e.g. `api/v2`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_suffix: Option<String>,

    /// Endpoint paths whose server errors are not surfaced as notifications
    #[serde(default)]
    pub silent_paths: Vec<String>,

    /// Directory holding mock payloads (`<lastPathSegment>.json`)
    #[serde(default = "default_mock_dir")]
    pub mock_dir: String,

    /// Pending age after which the backend counts as slow
    #[serde(default = "default_slow_threshold", with = "duration_millis")]
    pub slow_threshold: Duration,

    /// Quiet period before the slow flag clears once nothing is pending
    #[serde(default = "default_clear_debounce", with = "duration_millis")]
    pub clear_debounce: Duration,
}

fn default_mock_dir() -> String {
    "assets/mock-data".to_string()
}

fn default_slow_threshold() -> Duration {
    Duration::from_millis(5000)
}

fn default_clear_debounce() -> Duration {
    Duration::from_millis(500)
}

impl ClientConfig {
    /// Create a config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            env_suffix: None,
            silent_paths: Vec::new(),
            mock_dir: default_mock_dir(),
            slow_threshold: default_slow_threshold(),
            clear_debounce: default_clear_debounce(),
        }
    }

    /// Set the environment suffix
    pub fn with_env_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.env_suffix = Some(suffix.into());
        self
    }

    /// Add a silent-failure endpoint path
    pub fn with_silent_path(mut self, path: impl Into<String>) -> Self {
        self.silent_paths.push(path.into());
        self
    }

    /// Whether server errors for this path go unnotified
    pub fn is_silent_path(&self, path: &str) -> bool {
        self.silent_paths.iter().any(|p| p == path)
    }
}

/// Durations serialized as integer milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
