//! Control-plane fetcher: builds the domains request and installs the
//! parsed response into the allowlist store.

use std::sync::Arc;
use std::time::Duration;

use hostgate_core::allowlist::AllowlistStore;
use hostgate_core::domains::parse_domains;
use hostgate_core::error::{HostGateError, Result};

use crate::config::FilterConfig;
use crate::host::{CallResponse, CallToken, HeaderPairs, PluginHost};

/// Summary of a successfully applied refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub revision: u64,
    pub domains: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct ControlPlaneFetcher {
    cluster: String,
    api_host: String,
    path: String,
    timeout: Duration,
    store: Arc<AllowlistStore>,
}

impl ControlPlaneFetcher {
    pub fn new(cfg: &FilterConfig, store: Arc<AllowlistStore>) -> Self {
        Self {
            cluster: cfg.cluster.clone(),
            api_host: cfg.api_host.trim().to_string(),
            path: cfg.domains_path.clone(),
            timeout: cfg.call_timeout(),
            store,
        }
    }

    pub fn request_headers(&self) -> HeaderPairs {
        vec![
            (":method".into(), "GET".into()),
            (":authority".into(), self.api_host.clone()),
            (":path".into(), self.path.clone()),
            ("accept".into(), "*/*".into()),
        ]
    }

    /// Issue one non-blocking fetch.
    pub fn dispatch(&self, host: &mut dyn PluginHost) -> Result<CallToken> {
        host.dispatch_http_call(&self.cluster, self.request_headers(), None, self.timeout)
    }

    /// Handle a call completion. On any error the store is left untouched.
    pub fn apply(&self, outcome: Result<CallResponse>) -> Result<Installed> {
        let resp = outcome?;
        if !resp.is_success() {
            return Err(HostGateError::Response(format!(
                "control plane returned status {}",
                resp.status
            )));
        }

        let parsed = parse_domains(&resp.body)?;
        let revision = self.store.replace(&parsed.domains);
        Ok(Installed {
            revision,
            domains: self.store.len(),
            skipped: parsed.skipped,
        })
    }
}
