//! Form builders and the descriptions they produce
//!
//! Builders accumulate fields through chained calls; `show` freezes a copy of
//! the accumulated data, submits it and decodes the host's reply against that
//! same copy.

mod action;
mod message;
mod modal;

pub use action::{ActionElement, ActionForm, ActionFormData};
pub use message::{MessageForm, MessageFormData};
pub use modal::{Control, ModalForm, ModalFormData};

use serde::{Deserialize, Serialize};

use crate::error::BrokerResult;
use crate::host::HostReply;
use crate::outcome::{
    ActionFormResponse, FormOutcome, MessageFormResponse, ModalFormResponse, RejectionReason,
};
use crate::target::FormTarget;

/// A complete form as sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormDescription {
    Action(ActionFormData),
    Message(MessageFormData),
    Modal(ModalFormData),
}

/// Outcome of any form kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "outcome", rename_all = "snake_case")]
pub enum FormResponse {
    Action(ActionFormResponse),
    Message(MessageFormResponse),
    Modal(ModalFormResponse),
}

impl FormDescription {
    /// Show a description that was not built in code, e.g. one loaded from JSON
    pub async fn show(&self, target: &FormTarget) -> BrokerResult<FormResponse> {
        let reply = target.submit(self.clone()).await?;
        Ok(self.decode(reply))
    }

    /// Interpret a raw host reply against this description
    pub fn decode(&self, reply: HostReply) -> FormResponse {
        match self {
            FormDescription::Action(data) => FormResponse::Action(data.decode(reply)),
            FormDescription::Message(data) => FormResponse::Message(data.decode(reply)),
            FormDescription::Modal(data) => FormResponse::Modal(data.decode(reply)),
        }
    }
}

/// Decode a button selection, rejecting indices the form never offered
fn decode_selection(reply: HostReply, button_count: usize) -> FormOutcome<usize> {
    match reply {
        HostReply::Completed {
            selection: Some(index),
            ..
        } if index < button_count => FormOutcome::Completed(index),
        HostReply::Completed { selection, .. } => {
            tracing::warn!(?selection, button_count, "host reply has no valid selection");
            FormOutcome::Rejected(RejectionReason::MalformedResponse)
        }
        HostReply::Canceled { reason } => FormOutcome::Canceled(reason),
        HostReply::Rejected { reason } => FormOutcome::Rejected(reason),
    }
}
