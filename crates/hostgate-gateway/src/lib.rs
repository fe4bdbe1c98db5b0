//! hostgate gateway library entry.
//!
//! This crate wires the filter lifecycle (plugin context, refresh scheduler,
//! control-plane fetcher, per-request authorization) to a tokio/axum host.
//! The filter itself only depends on the capability traits in [`host`], so
//! it can be driven by any host that implements them, tests included.

pub mod app_state;
pub mod config;
pub mod filter;
pub mod host;
pub mod obs;
pub mod ops;
pub mod router;
pub mod runtime;
pub mod transport;
