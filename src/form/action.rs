//! Action forms: a body of text and a list of buttons

use serde::{Deserialize, Serialize};

use super::{decode_selection, FormDescription};
use crate::error::BrokerResult;
use crate::host::HostReply;
use crate::outcome::ActionFormResponse;
use crate::target::FormTarget;
use crate::text::Text;

/// One entry of an action form, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        text: Text,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    Header {
        text: Text,
    },
    Label {
        text: Text,
    },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionFormData {
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub body: Text,
    #[serde(default)]
    pub elements: Vec<ActionElement>,
}

impl ActionFormData {
    /// Number of buttons; headers, labels and dividers are not selectable
    pub fn button_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, ActionElement::Button { .. }))
            .count()
    }

    /// Label of the button at `index`, counting buttons only
    pub fn button(&self, index: usize) -> Option<&Text> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                ActionElement::Button { text, .. } => Some(text),
                _ => None,
            })
            .nth(index)
    }

    pub fn decode(&self, reply: HostReply) -> ActionFormResponse {
        decode_selection(reply, self.button_count())
    }
}

/// Builder for an action form
///
/// ```no_run
/// # async fn demo(target: form_broker::FormTarget) -> form_broker::BrokerResult<()> {
/// use form_broker::ActionForm;
///
/// let response = ActionForm::new()
///     .title("Months")
///     .body("Choose your favorite month!")
///     .button("January", None)
///     .button("February", Some("textures/ui/snow"))
///     .show(&target)
///     .await?;
/// if let Some(index) = response.selection() {
///     println!("picked button {index}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionForm {
    data: ActionFormData,
}

impl ActionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, text: impl Into<Text>) -> Self {
        self.data.title = text.into();
        self
    }

    pub fn body(mut self, text: impl Into<Text>) -> Self {
        self.data.body = text.into();
        self
    }

    /// Append a button; the first button added is index 0
    pub fn button(mut self, text: impl Into<Text>, icon: Option<&str>) -> Self {
        self.data.elements.push(ActionElement::Button {
            text: text.into(),
            icon: icon.map(str::to_string),
        });
        self
    }

    pub fn header(mut self, text: impl Into<Text>) -> Self {
        self.data.elements.push(ActionElement::Header { text: text.into() });
        self
    }

    pub fn label(mut self, text: impl Into<Text>) -> Self {
        self.data.elements.push(ActionElement::Label { text: text.into() });
        self
    }

    pub fn divider(mut self) -> Self {
        self.data.elements.push(ActionElement::Divider);
        self
    }

    pub fn data(&self) -> &ActionFormData {
        &self.data
    }

    /// Snapshot of the form as it would be submitted now
    pub fn description(&self) -> FormDescription {
        FormDescription::Action(self.data.clone())
    }

    /// Show the form to `target` and wait for the user's choice
    pub async fn show(&self, target: &FormTarget) -> BrokerResult<ActionFormResponse> {
        let reply = target.submit(self.description()).await?;
        Ok(self.data.decode(reply))
    }
}
