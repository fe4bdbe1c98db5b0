use std::collections::BTreeMap;

use serde::Deserialize;
use hostgate_core::error::{HostGateError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    /// Upstream name -> base URL used when the filter dispatches a call.
    #[serde(default)]
    pub clusters: BTreeMap<String, String>,

    /// Plugin configuration, handed to every filter instance as JSON.
    pub filter: serde_json::Value,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HostGateError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if !self.filter.is_object() {
            return Err(HostGateError::Config("filter must be a mapping".into()));
        }

        self.gateway.validate()?;

        for (name, base) in &self.clusters {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(HostGateError::Config(format!(
                    "clusters.{name} must be an http(s) base URL"
                )));
            }
        }

        Ok(())
    }

    /// Plugin configuration bytes, as a host would deliver them.
    pub fn plugin_configuration(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.filter)
            .map_err(|e| HostGateError::Internal(format!("encode plugin config failed: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ops_listen")]
    pub ops_listen: String,

    /// Number of independent filter instances (each with its own allowlist).
    #[serde(default = "default_instances")]
    pub instances: usize,

    /// Reverse-proxy target. When unset, requests are forwarded to their own
    /// authority (forward-proxy mode).
    #[serde(default)]
    pub upstream: Option<String>,

    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ops_listen: default_ops_listen(),
            instances: default_instances(),
            upstream: None,
            forward_timeout_ms: default_forward_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.instances) {
            return Err(HostGateError::Config(
                "gateway.instances must be between 1 and 64".into(),
            ));
        }
        if !(100..=300_000).contains(&self.forward_timeout_ms) {
            return Err(HostGateError::Config(
                "gateway.forward_timeout_ms must be between 100 and 300000".into(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(HostGateError::Config(
                "gateway.max_body_bytes must be greater than 0".into(),
            ));
        }
        if let Some(up) = &self.upstream {
            if !(up.starts_with("http://") || up.starts_with("https://")) {
                return Err(HostGateError::Config(
                    "gateway.upstream must be an http(s) base URL".into(),
                ));
            }
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ops_listen() -> String {
    "127.0.0.1:9901".into()
}
fn default_instances() -> usize {
    1
}
fn default_forward_timeout_ms() -> u64 {
    30_000
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
