//! Form Broker - player-facing modal forms
//!
//! Build a form with [`ActionForm`], [`MessageForm`] or [`ModalForm`], show it
//! to a [`FormTarget`] and await exactly one [`FormOutcome`]. Rendering is
//! left to a [`FormHost`]; [`FormService`] correlates submissions with the
//! host's replies.

pub mod config;
pub mod error;
pub mod form;
pub mod host;
pub mod outcome;
pub mod service;
pub mod target;
pub mod text;

pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult, HostError};
pub use form::{
    ActionForm, Control, FormDescription, FormResponse, MessageForm, ModalForm,
};
pub use host::{
    ChannelHost, FormHost, HostEvent, HostReply, ProcessHost, Submission, SubmissionId,
};
pub use outcome::{
    ActionFormResponse, CancelationReason, FormOutcome, FormValue, MessageFormResponse,
    ModalFormResponse, RejectionReason,
};
pub use service::FormService;
pub use target::{FormTarget, TargetId};
pub use text::Text;
