use std::time::Duration;

use cyberscope_model::{ModelError, SessionId};
use thiserror::Error;

/// Every failure the scan engine can report.
///
/// Variants up to and including `SessionTerminal` surface synchronously to the
/// caller. `Privilege`, `ToolInvocation`, `Timeout` and `MalformedReport` are
/// normally recorded into the failed session's `error_message` instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid target: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scan already running for session {0}")]
    AlreadyRunning(SessionId),

    #[error("Session {0} already reached a terminal state")]
    SessionTerminal(SessionId),

    #[error("Insufficient privileges: {0}")]
    Privilege(String),

    #[error("Scanner invocation failed: {0}")]
    ToolInvocation(String),

    #[error("Scan timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Malformed scan report: {0}")]
    MalformedReport(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ScanError {
    pub fn session_not_found(id: SessionId) -> Self {
        ScanError::NotFound(format!("scan session {id}"))
    }
}

impl From<ModelError> for ScanError {
    fn from(err: ModelError) -> Self {
        ScanError::Validation(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ScanError {
    fn from(err: sqlx::Error) -> Self {
        ScanError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
