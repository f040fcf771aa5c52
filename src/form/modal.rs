//! Modal forms: a title and an ordered list of input controls

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FormDescription;
use crate::error::BrokerResult;
use crate::host::HostReply;
use crate::outcome::{FormOutcome, FormValue, ModalFormResponse, RejectionReason};
use crate::target::FormTarget;
use crate::text::Text;

/// One input control
///
/// Stored exactly as given: a zero step, `min > max` or an empty option list
/// is for the host to judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    Dropdown {
        label: Text,
        options: Vec<Text>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_index: Option<usize>,
    },
    Slider {
        label: Text,
        min: f64,
        max: f64,
        step: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    TextField {
        label: Text,
        placeholder: Text,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Text>,
    },
    Toggle {
        label: Text,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
}

impl Control {
    pub fn label(&self) -> &Text {
        match self {
            Control::Dropdown { label, .. }
            | Control::Slider { label, .. }
            | Control::TextField { label, .. }
            | Control::Toggle { label, .. } => label,
        }
    }

    /// Convert a raw submitted value, or `None` if it does not fit this control
    fn decode_value(&self, raw: &Value) -> Option<FormValue> {
        match (self, raw) {
            (Control::Toggle { .. }, Value::Bool(b)) => Some(FormValue::Bool(*b)),
            (Control::Slider { .. }, Value::Number(n)) => n.as_f64().map(FormValue::Number),
            (Control::TextField { .. }, Value::String(s)) => Some(FormValue::Text(s.clone())),
            (Control::Dropdown { options, .. }, Value::Number(n)) => n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .filter(|i| *i < options.len())
                .map(FormValue::Index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModalFormData {
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button: Option<Text>,
}

impl ModalFormData {
    /// Decode submitted values; the list must match the controls one to one
    pub fn decode(&self, reply: HostReply) -> ModalFormResponse {
        match reply {
            HostReply::Completed {
                form_values: Some(raw),
                ..
            } => match self.decode_values(&raw) {
                Some(values) => FormOutcome::Completed(values),
                None => {
                    tracing::warn!(
                        expected = self.controls.len(),
                        received = raw.len(),
                        "host reply does not match modal controls"
                    );
                    FormOutcome::Rejected(RejectionReason::MalformedResponse)
                }
            },
            HostReply::Completed {
                form_values: None, ..
            } => {
                tracing::warn!("host reply for modal form carries no values");
                FormOutcome::Rejected(RejectionReason::MalformedResponse)
            }
            HostReply::Canceled { reason } => FormOutcome::Canceled(reason),
            HostReply::Rejected { reason } => FormOutcome::Rejected(reason),
        }
    }

    fn decode_values(&self, raw: &[Value]) -> Option<Vec<FormValue>> {
        if raw.len() != self.controls.len() {
            return None;
        }
        self.controls
            .iter()
            .zip(raw)
            .map(|(control, value)| control.decode_value(value))
            .collect()
    }
}

/// Builder for a modal form
///
/// Each control call appends; the submitted values come back in call order.
#[derive(Debug, Clone, Default)]
pub struct ModalForm {
    data: ModalFormData,
}

impl ModalForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, text: impl Into<Text>) -> Self {
        self.data.title = text.into();
        self
    }

    pub fn submit_button(mut self, text: impl Into<Text>) -> Self {
        self.data.submit_button = Some(text.into());
        self
    }

    pub fn dropdown<I, T>(
        mut self,
        label: impl Into<Text>,
        options: I,
        default_index: Option<usize>,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Text>,
    {
        self.data.controls.push(Control::Dropdown {
            label: label.into(),
            options: options.into_iter().map(Into::into).collect(),
            default_index,
        });
        self
    }

    pub fn slider(
        mut self,
        label: impl Into<Text>,
        min: f64,
        max: f64,
        step: f64,
        default: Option<f64>,
    ) -> Self {
        self.data.controls.push(Control::Slider {
            label: label.into(),
            min,
            max,
            step,
            default,
        });
        self
    }

    pub fn text_field(
        mut self,
        label: impl Into<Text>,
        placeholder: impl Into<Text>,
        default: Option<impl Into<Text>>,
    ) -> Self {
        self.data.controls.push(Control::TextField {
            label: label.into(),
            placeholder: placeholder.into(),
            default: default.map(Into::into),
        });
        self
    }

    pub fn toggle(mut self, label: impl Into<Text>, default: Option<bool>) -> Self {
        self.data.controls.push(Control::Toggle {
            label: label.into(),
            default,
        });
        self
    }

    pub fn data(&self) -> &ModalFormData {
        &self.data
    }

    pub fn description(&self) -> FormDescription {
        FormDescription::Modal(self.data.clone())
    }

    pub async fn show(&self, target: &FormTarget) -> BrokerResult<ModalFormResponse> {
        let reply = target.submit(self.description()).await?;
        Ok(self.data.decode(reply))
    }
}
