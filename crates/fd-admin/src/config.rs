//! Client configuration from environment variables.

use std::time::Duration;

/// Configuration for the admin API client and the view-session poller.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:30080".to_string(),
            timeout_secs: 30,
            poll_interval_secs: 10,
        }
    }
}

impl AdminConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("FLOWDECK_ADMIN_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_url);

        let timeout_secs = std::env::var("FLOWDECK_ADMIN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let poll_interval_secs = std::env::var("FLOWDECK_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.poll_interval_secs);

        Self {
            base_url,
            timeout_secs,
            poll_interval_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
