//! Message forms: a body of text and exactly two buttons

use serde::{Deserialize, Serialize};

use super::{decode_selection, FormDescription};
use crate::error::BrokerResult;
use crate::host::HostReply;
use crate::outcome::MessageFormResponse;
use crate::target::FormTarget;
use crate::text::Text;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageFormData {
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub body: Text,
    #[serde(default)]
    pub button1: Text,
    #[serde(default)]
    pub button2: Text,
}

impl MessageFormData {
    pub fn decode(&self, reply: HostReply) -> MessageFormResponse {
        decode_selection(reply, 2)
    }
}

/// Builder for a two-button message form
///
/// Selection 0 is `button1` and selection 1 is `button2`, whatever order the
/// setters were called in.
#[derive(Debug, Clone, Default)]
pub struct MessageForm {
    data: MessageFormData,
}

impl MessageForm {
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

    pub fn button1(mut self, text: impl Into<Text>) -> Self {
        self.data.button1 = text.into();
        self
    }

    pub fn button2(mut self, text: impl Into<Text>) -> Self {
        self.data.button2 = text.into();
        self
    }

    pub fn data(&self) -> &MessageFormData {
        &self.data
    }

    pub fn description(&self) -> FormDescription {
        FormDescription::Message(self.data.clone())
    }

    pub async fn show(&self, target: &FormTarget) -> BrokerResult<MessageFormResponse> {
        let reply = target.submit(self.description()).await?;
        Ok(self.data.decode(reply))
    }
}
