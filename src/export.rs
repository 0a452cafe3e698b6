//! Telegram Desktop export model (`result.json`)
//!
//! Messages are kept as raw JSON values at the file level so that a single
//! odd element never fails the whole export; each one is parsed into a
//! [`RawMessage`] on its own.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Root object of a chat export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatExport {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
    pub id: Option<i64>,
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// One exported message, reduced to the fields the importer looks at.
///
/// `photo` and `media_type` record key presence: a key present with a
/// `null` value is `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub photo: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub media_type: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub text: Option<MessageText>,
}

/// Message text: either a plain string or a list of formatted fragments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    Plain(String),
    Fragments(Vec<TextFragment>),
}

/// A piece of formatted text (`text_entities` style).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextFragment {
    Plain(String),
    Entity {
        #[serde(default)]
        text: Option<String>,
    },
}

impl MessageText {
    /// Flatten into a single string; fragments are joined without separator.
    pub fn to_plain(&self) -> String {
        match self {
            MessageText::Plain(s) => s.clone(),
            MessageText::Fragments(fragments) => {
                fragments.iter().map(TextFragment::as_str).collect()
            }
        }
    }
}

impl TextFragment {
    pub fn as_str(&self) -> &str {
        match self {
            TextFragment::Plain(s) => s,
            TextFragment::Entity { text } => text.as_deref().unwrap_or(""),
        }
    }
}

impl RawMessage {
    /// Parse a single message element.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(RawMessage::deserialize(value)?)
    }

    pub fn caption(&self) -> String {
        self.text
            .as_ref()
            .map(MessageText::to_plain)
            .unwrap_or_default()
    }
}

/// Only called when the key exists, so `null` still means "present".
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Accept any JSON for `text`; shapes other than string/array become `None`,
/// and array items that are neither strings nor objects are dropped.
fn deserialize_lenient_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<MessageText>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(MessageText::Plain(s)),
        Value::Array(items) => Some(MessageText::Fragments(
            items.into_iter().filter_map(fragment_from_value).collect(),
        )),
        _ => None,
    })
}

fn fragment_from_value(value: Value) -> Option<TextFragment> {
    match value {
        Value::String(s) => Some(TextFragment::Plain(s)),
        Value::Object(map) => Some(TextFragment::Entity {
            text: map.get("text").and_then(Value::as_str).map(str::to_string),
        }),
        _ => None,
    }
}

/// Read and parse an export file.
pub fn load_export<P: AsRef<Path>>(path: P) -> Result<ChatExport> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::InputNotFound(path.display().to_string()),
        _ => Error::IoError(e),
    })?;
    parse_export(&content)
}

pub fn parse_export(content: &str) -> Result<ChatExport> {
    Ok(serde_json::from_str(content)?)
}
