//! Tokio-based host environment for filter instances.

pub mod caller;
pub mod instance;

pub use caller::{HttpCaller, OutboundCall, ReqwestCaller};
pub use instance::{spawn_instance, InstanceHandle, InstanceSpec, TokioHost};
