//! Per-request HTTP context: extract the host, decide, and reject locally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hostgate_core::authority::{find_authority, host_from_authority};
use hostgate_core::decision::{rejection_headers, Decision, DecisionEngine, REJECT_STATUS};

use crate::host::StreamHost;
use crate::obs::GatewayMetrics;

/// What the host should do with the request after the headers hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Forward the request.
    Continue,
    /// Stop processing; a local reply has been sent.
    Pause,
}

/// Transient per-request state, dropped once the decision is made.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub authority: Option<String>,
    pub host: String,
}

/// Creates HTTP contexts bound to one plugin instance's allowlist.
#[derive(Clone)]
pub struct HttpContextFactory {
    instance: Arc<str>,
    engine: DecisionEngine,
    metrics: Arc<GatewayMetrics>,
    next_id: Arc<AtomicU64>,
}

impl HttpContextFactory {
    pub(crate) fn new(instance_id: u32, engine: DecisionEngine, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            instance: Arc::from(instance_id.to_string()),
            engine,
            metrics,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn new_http_context(&self) -> HttpContext {
        HttpContext {
            context_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            instance: Arc::clone(&self.instance),
            engine: self.engine.clone(),
            metrics: Arc::clone(&self.metrics),
            decision: None,
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }
}

pub struct HttpContext {
    context_id: u64,
    instance: Arc<str>,
    engine: DecisionEngine,
    metrics: Arc<GatewayMetrics>,
    decision: Option<Decision>,
}

impl HttpContext {
    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Decision taken for this request, once headers were processed.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Authorize the request. Never blocks; reads the installed snapshot only.
    ///
    /// Unreadable headers are treated like a missing authority (rejected).
    pub fn on_http_request_headers(&mut self, stream: &mut dyn StreamHost) -> Action {
        let req = match stream.request_headers() {
            Ok(headers) => {
                let authority = find_authority(&headers).map(str::to_owned);
                let host = authority.as_deref().map(host_from_authority).unwrap_or_default();
                RequestContext { authority, host }
            }
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    instance = %self.instance,
                    context = self.context_id,
                    error = %e,
                    "failed to get request headers"
                );
                RequestContext { authority: None, host: String::new() }
            }
        };

        let decision = self.engine.decide(&req.host);
        self.decision = Some(decision);
        self.metrics
            .decisions
            .inc(&[("instance", &*self.instance), ("decision", decision.as_str())]);

        match decision {
            Decision::Continue => Action::Continue,
            Decision::Reject => {
                tracing::debug!(
                    instance = %self.instance,
                    context = self.context_id,
                    authority = req.authority.as_deref().unwrap_or(""),
                    host = %req.host,
                    "request rejected: domain not allowed"
                );
                if let Err(e) = stream.send_http_response(REJECT_STATUS, rejection_headers(), None) {
                    tracing::error!(
                        instance = %self.instance,
                        context = self.context_id,
                        error = %e,
                        "failed to send rejection"
                    );
                }
                Action::Pause
            }
        }
    }
}
