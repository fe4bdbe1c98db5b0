//! Shared error type across hostgate crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error categories (used in logs, metrics and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Tick period could not be installed.
    Scheduling,
    /// Outbound call could not be issued or did not complete in time.
    Dispatch,
    /// Outbound call completed but its response was unusable.
    Response,
    /// Payload was not valid JSON of the expected shape.
    Parse,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Scheduling => "SCHEDULING",
            ErrorKind::Dispatch => "DISPATCH",
            ErrorKind::Response => "RESPONSE",
            ErrorKind::Parse => "PARSE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HostGateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum HostGateError {
    #[error("config: {0}")]
    Config(String),
    #[error("scheduling: {0}")]
    Scheduling(String),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("bad response: {0}")]
    Response(String),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl HostGateError {
    /// Map the error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HostGateError::Config(_) => ErrorKind::Config,
            HostGateError::Scheduling(_) => ErrorKind::Scheduling,
            HostGateError::Dispatch(_) | HostGateError::Timeout(_) => ErrorKind::Dispatch,
            HostGateError::Response(_) => ErrorKind::Response,
            HostGateError::Parse(_) => ErrorKind::Parse,
            HostGateError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Fatal errors abort plugin startup; everything else is absorbed per cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config | ErrorKind::Scheduling)
    }
}
