//! Error types
//!
//! Form-level failures (a user closing a dialog, a player leaving) are
//! outcomes, not errors. These types cover faults of the environment the
//! broker runs in.

use thiserror::Error;

use crate::host::SubmissionId;
use crate::target::TargetId;

/// Faults that prevent the broker from producing any outcome
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("form host unavailable: {0}")]
    HostUnavailable(String),

    #[error("no pending submission {0}")]
    UnknownSubmission(SubmissionId),

    #[error("invalid form JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures a host reports while accepting a submission for presentation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The addressed user is not connected
    #[error("target {0} is not connected")]
    TargetGone(TargetId),

    /// The host could not make sense of the outgoing form
    #[error("malformed form: {0}")]
    Malformed(String),

    /// The host cannot be reached at all
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
