//! Filter lifecycle (host-agnostic).
//!
//! - [`plugin::PluginContext`]: start, tick, call completion
//! - [`fetcher`]: control-plane request and response handling
//! - [`scheduler`]: tick policy and in-flight tracking
//! - [`http::HttpContext`]: per-request authorization

pub mod fetcher;
pub mod http;
pub mod plugin;
pub mod scheduler;

pub use http::{Action, HttpContext, HttpContextFactory};
pub use plugin::PluginContext;
