//! Form outcomes and reason codes
//!
//! A shown form resolves to exactly one [`FormOutcome`]. Cancelations and
//! rejections are ordinary outcomes, delivered through `Ok`.

use serde::{Deserialize, Serialize};

/// Why a user dismissed a form without completing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelationReason {
    /// Another form was already open for the target
    UserBusy,
    /// The user closed the dialog
    UserClosed,
}

/// Why a form request could not be fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    MalformedResponse,
    PlayerQuit,
    ServerShutdown,
}

/// Terminal resolution of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum FormOutcome<T> {
    Completed(T),
    Canceled(CancelationReason),
    Rejected(RejectionReason),
}

impl<T> FormOutcome<T> {
    /// True when the user dismissed the form
    pub fn canceled(&self) -> bool {
        matches!(self, FormOutcome::Canceled(_))
    }

    pub fn cancelation_reason(&self) -> Option<CancelationReason> {
        match self {
            FormOutcome::Canceled(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            FormOutcome::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Completed data, or `None` when canceled or rejected
    pub fn completed(&self) -> Option<&T> {
        match self {
            FormOutcome::Completed(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_completed(self) -> Option<T> {
        match self {
            FormOutcome::Completed(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FormOutcome<U> {
        match self {
            FormOutcome::Completed(data) => FormOutcome::Completed(f(data)),
            FormOutcome::Canceled(reason) => FormOutcome::Canceled(reason),
            FormOutcome::Rejected(reason) => FormOutcome::Rejected(reason),
        }
    }
}

/// Outcome of an action form; completed data is the button index
pub type ActionFormResponse = FormOutcome<usize>;

/// Outcome of a message form; 0 is `button1`, 1 is `button2`
pub type MessageFormResponse = FormOutcome<usize>;

/// Outcome of a modal form; one value per control, in declaration order
pub type ModalFormResponse = FormOutcome<Vec<FormValue>>;

impl FormOutcome<usize> {
    /// Selected button index
    pub fn selection(&self) -> Option<usize> {
        self.completed().copied()
    }
}

impl FormOutcome<Vec<FormValue>> {
    pub fn form_values(&self) -> Option<&[FormValue]> {
        self.completed().map(Vec::as_slice)
    }
}

/// Value submitted for one modal control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    /// Toggle state
    Bool(bool),
    /// Dropdown option index
    Index(usize),
    /// Slider position
    Number(f64),
    /// Text field contents
    Text(String),
}

impl FormValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            FormValue::Index(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Bool(value)
    }
}

impl From<f64> for FormValue {
    fn from(value: f64) -> Self {
        FormValue::Number(value)
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}
