//! The seam between the broker and the runtime that renders forms
//!
//! The broker hands each [`Submission`] to a [`FormHost`] and later receives
//! the user's answer as a [`HostEvent`]. Both types are the newline-delimited
//! JSON protocol spoken by [`ProcessHost`].

mod channel;
mod process;

pub use channel::ChannelHost;
pub use process::ProcessHost;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BrokerResult, HostError};
use crate::form::FormDescription;
use crate::outcome::{CancelationReason, RejectionReason};
use crate::target::TargetId;

/// Identifier of one presentation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A form on its way to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub target: TargetId,
    pub submitted_at: DateTime<Utc>,
    pub form: FormDescription,
}

/// The host's raw answer to one submission
///
/// Completed replies are checked against the submitted form before they
/// reach the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostReply {
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selection: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_values: Option<Vec<Value>>,
    },
    Canceled {
        reason: CancelationReason,
    },
    Rejected {
        reason: RejectionReason,
    },
}

impl HostReply {
    /// A button was pressed
    pub fn selected(index: usize) -> Self {
        HostReply::Completed {
            selection: Some(index),
            form_values: None,
        }
    }

    /// A modal form was submitted
    pub fn values(values: Vec<Value>) -> Self {
        HostReply::Completed {
            selection: None,
            form_values: Some(values),
        }
    }

    pub fn canceled(reason: CancelationReason) -> Self {
        HostReply::Canceled { reason }
    }

    pub fn rejected(reason: RejectionReason) -> Self {
        HostReply::Rejected { reason }
    }
}

/// Something the host tells the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A submission was answered
    Reply { id: SubmissionId, reply: HostReply },
    /// A user disconnected
    TargetLeft { target: TargetId },
    /// The host is going away
    Shutdown,
}

impl HostEvent {
    /// Parse one protocol line
    pub fn from_line(line: &str) -> BrokerResult<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Runtime that presents forms to users
///
/// `present` only hands the form over; the answer arrives later through
/// [`crate::FormService::handle_event`] or [`crate::FormService::resolve`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormHost: Send + Sync {
    async fn present(&self, submission: &Submission) -> Result<(), HostError>;
}
