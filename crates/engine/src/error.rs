//! Failure taxonomy for diagnostic tests.
//!
//! Every variant is recoverable: the runner turns it into an `error`
//! outcome for the affected test id and carries on with the batch.

use serde::{Deserialize, Serialize};

pub type DiagResult<T> = Result<T, DiagError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagError {
    #[error("probe unavailable: {program}: {reason}")]
    ProbeUnavailable { program: String, reason: String },

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("unknown test: {0}")]
    UnknownTest(String),

    #[error("transport unreachable: {0}")]
    TransportUnreachable(String),

    #[error("cancelled before start")]
    Cancelled,

    #[error("internal fault: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProbeUnavailable,
    ParseFailure,
    UnknownTest,
    TransportUnreachable,
    Cancelled,
    Internal,
}

impl DiagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagError::ProbeUnavailable { .. } => ErrorKind::ProbeUnavailable,
            DiagError::ParseFailure(_) => ErrorKind::ParseFailure,
            DiagError::UnknownTest(_) => ErrorKind::UnknownTest,
            DiagError::TransportUnreachable(_) => ErrorKind::TransportUnreachable,
            DiagError::Cancelled => ErrorKind::Cancelled,
            DiagError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable explanation for the outcome of `test_id`.
    pub fn explanation(&self, test_id: &str) -> String {
        match self {
            DiagError::ProbeUnavailable { program, reason } => {
                format!("Could not run {} for {}: {}", program, test_id, reason)
            }
            DiagError::ParseFailure(msg) => {
                format!("Could not interpret output for {}: {}", test_id, msg)
            }
            DiagError::UnknownTest(id) => format!("Test not implemented: {}", id),
            DiagError::TransportUnreachable(msg) => msg.clone(),
            DiagError::Cancelled => format!("Run cancelled before {} started", test_id),
            DiagError::Internal(msg) => format!("Test execution failed: {}", msg),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        DiagError::ParseFailure(msg.into())
    }
}
