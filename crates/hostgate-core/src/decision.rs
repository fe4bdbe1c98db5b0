//! Authorization decision engine.
//!
//! Decisions are synchronous and only read the already-installed snapshot;
//! nothing here performs I/O or waits on a refresh.

use std::sync::Arc;

use crate::allowlist::AllowlistStore;

/// Status code of the local reply sent for rejected requests.
pub const REJECT_STATUS: u16 = 403;
/// Diagnostic header attached to rejections.
pub const REJECT_REASON_HEADER: &str = "wasm-reason";
/// Value of [`REJECT_REASON_HEADER`].
pub const REJECT_REASON: &str = "domain not allowed";

/// Outcome of authorizing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Reject,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Continue => "continue",
            Decision::Reject => "reject",
        }
    }
}

/// Headers of the fixed rejection reply.
pub fn rejection_headers() -> Vec<(String, String)> {
    vec![(REJECT_REASON_HEADER.to_string(), REJECT_REASON.to_string())]
}

/// Consults an allowlist store. Clone freely; clones share the store.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    store: Arc<AllowlistStore>,
}

impl DecisionEngine {
    pub fn new(store: Arc<AllowlistStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AllowlistStore> {
        &self.store
    }

    /// Continue iff `host` is in the current snapshot.
    ///
    /// An empty host (no authority) and an unpopulated store both reject; the
    /// caller cannot tell the two apart.
    pub fn decide(&self, host: &str) -> Decision {
        if self.store.contains(host) {
            Decision::Continue
        } else {
            Decision::Reject
        }
    }
}
