//! Upstream HTTP client configuration

use serde::Deserialize;
use std::time::Duration;

/// Outbound client settings shared by every upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Ceiling on total call duration, streaming included
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300, // 5 minute ceiling for long generations
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 10,
        }
    }
}

/// Upstream settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileUpstream {
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub pool_max_idle_per_host: Option<usize>,
}

impl UpstreamConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileUpstream>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            connect_timeout_secs: file
                .connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            pool_max_idle_per_host: file
                .pool_max_idle_per_host
                .unwrap_or(defaults.pool_max_idle_per_host),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
