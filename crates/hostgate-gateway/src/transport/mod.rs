//! Proxy transport: interception middleware and forwarding.

pub mod forward;
pub mod intercept;
pub mod target;
