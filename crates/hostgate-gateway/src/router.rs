//! Axum router wiring.
//!
//! The proxy router sends every request through the interception middleware
//! and then to the forwarding fallback. Ops endpoints live on their own
//! listener so they are never subject to the allowlist.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(transport::forward::proxy)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            transport::intercept::intercept,
        ))
        .with_state(state)
}

pub fn build_ops_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
