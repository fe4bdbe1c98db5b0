//! hostgate core: allowlist store, host extraction, authorization decisions,
//! control-plane payload parsing and the shared error type.
//!
//! This crate carries no transport or runtime dependencies so the same
//! primitives can back any host environment that delivers request headers and
//! control-plane responses.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed control-plane payloads and request metadata surface as
//! `HostGateError` or as a rejection, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod allowlist;
pub mod authority;
pub mod decision;
pub mod domains;
pub mod error;

/// Shared result type.
pub use error::{ErrorKind, HostGateError, Result};
