//! Host capability interface.
//!
//! The filter never talks to sockets or timers directly. Whatever environment
//! embeds it (the tokio/axum runtime in [`crate::runtime`], or a test double)
//! implements these traits and delivers lifecycle events:
//!
//! - plugin level: start, tick, call completion ([`PluginHost`])
//! - stream level: request headers received ([`StreamHost`])
//!
//! Events for one plugin instance are delivered one at a time.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use hostgate_core::error::Result;

pub use hostgate_core::authority::HeaderPairs;

/// Correlates a dispatched call with its completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallToken(pub u32);

impl fmt::Display for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completed outbound call.
#[derive(Debug, Clone)]
pub struct CallResponse {
    pub status: u16,
    pub headers: HeaderPairs,
    pub body: Bytes,
}

impl CallResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capabilities available to the plugin context.
pub trait PluginHost {
    /// Raw plugin configuration bytes.
    fn plugin_configuration(&self) -> Result<Vec<u8>>;

    /// Arm the periodic tick. The host re-arms it after every tick.
    fn set_tick_period(&mut self, period: Duration) -> Result<()>;

    /// Issue a non-blocking outbound call. The outcome is delivered later via
    /// `PluginContext::on_http_call_response` with the returned token; a call
    /// that exceeds `timeout` completes with `HostGateError::Timeout`.
    fn dispatch_http_call(
        &mut self,
        upstream: &str,
        headers: HeaderPairs,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<CallToken>;
}

/// Capabilities available to a per-request HTTP context.
pub trait StreamHost {
    /// Full request header set, pseudo-headers included.
    fn request_headers(&self) -> Result<HeaderPairs>;

    /// Terminate the request with a local reply; it will not be forwarded.
    fn send_http_response(
        &mut self,
        status: u16,
        headers: HeaderPairs,
        body: Option<Bytes>,
    ) -> Result<()>;
}
