//! Plugin configuration (JSON), read once in `on_plugin_start`.

use std::time::Duration;

use serde::Deserialize;
use hostgate_core::error::{HostGateError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Control-plane authority. Required.
    #[serde(default)]
    pub api_host: String,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Upstream name passed to the host when dispatching.
    #[serde(default = "default_cluster")]
    pub cluster: String,

    #[serde(default = "default_domains_path")]
    pub domains_path: String,

    /// Dispatch one fetch right after start instead of waiting one interval.
    #[serde(default)]
    pub fetch_on_start: bool,

    /// Dispatch on every tick even while a previous fetch is still in flight.
    #[serde(default)]
    pub allow_overlapping_fetches: bool,
}

impl FilterConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let cfg: FilterConfig = serde_json::from_slice(bytes)
            .map_err(|e| HostGateError::Config(format!("invalid plugin configuration: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_host.trim().is_empty() {
            return Err(HostGateError::Config("api_host is not set".into()));
        }
        if !(100..=3_600_000).contains(&self.refresh_interval_ms) {
            return Err(HostGateError::Config(
                "refresh_interval_ms must be between 100 and 3600000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.call_timeout_ms) {
            return Err(HostGateError::Config(
                "call_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.cluster.trim().is_empty() {
            return Err(HostGateError::Config("cluster must not be empty".into()));
        }
        if !self.domains_path.starts_with('/') {
            return Err(HostGateError::Config("domains_path must start with '/'".into()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_refresh_interval_ms() -> u64 {
    5000
}
fn default_call_timeout_ms() -> u64 {
    5000
}
fn default_cluster() -> String {
    "controlplane".into()
}
fn default_domains_path() -> String {
    "/domains".into()
}
