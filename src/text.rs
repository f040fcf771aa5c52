//! Display text for titles, bodies and labels
//!
//! Every place a form shows text accepts either a plain string or a
//! localizable message. The host resolves translation keys; this crate only
//! carries them.

use serde::{Deserialize, Serialize};

/// Plain or localizable text
///
/// Serialized untagged: plain text is a JSON string, a translation is
/// `{"translate": "key", "with": [...]}` and a concatenation is
/// `{"rawtext": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Translate {
        translate: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        with: Vec<Text>,
    },
    Raw { rawtext: Vec<Text> },
}

impl Text {
    /// Translation key with ordered substitution values
    pub fn translate<I, T>(key: impl Into<String>, with: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Text>,
    {
        Text::Translate {
            translate: key.into(),
            with: with.into_iter().map(Into::into).collect(),
        }
    }

    /// Concatenation of several pieces, rendered in order
    pub fn raw<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Text>,
    {
        Text::Raw {
            rawtext: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// The plain string, if this is plain text
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Text::Plain(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Text {
    fn default() -> Self {
        Text::Plain(String::new())
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text::Plain(value.to_string())
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text::Plain(value)
    }
}

impl From<&String> for Text {
    fn from(value: &String) -> Self {
        Text::Plain(value.clone())
    }
}
