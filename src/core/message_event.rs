use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-event sink handed to the decoder. Invoked once per decoded unit, in order.
pub type EventCallback = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// One decoded unit of a chat response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub response: String,
    pub thinking: String,
    pub done: bool,
}

impl Default for MessageEvent {
    fn default() -> Self {
        Self {
            response: String::new(),
            thinking: String::new(),
            done: true,
        }
    }
}

impl MessageEvent {
    pub fn new(response: impl Into<String>, thinking: impl Into<String>, done: bool) -> Self {
        Self {
            response: response.into(),
            thinking: thinking.into(),
            done,
        }
    }

    /// Passthrough event for text that is not JSON.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            response: text.into(),
            ..Self::default()
        }
    }

    /// Maps any JSON value onto the event shape.
    ///
    /// `response` falls back to the whole value serialized when the field is
    /// missing or not a string, `thinking` falls back to empty and `done` to
    /// `true` when absent or not a boolean.
    pub fn from_value(value: &Value) -> Self {
        let response = match value.get("response").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
        };
        let thinking = value
            .get("thinking")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let done = value.get("done").and_then(Value::as_bool).unwrap_or(true);

        Self {
            response,
            thinking,
            done,
        }
    }
}

/// Result of checking one candidate unit against the event schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedUnit {
    Structured(MessageEvent),
    Raw(String),
}

impl DecodedUnit {
    pub fn parse(candidate: &str) -> Self {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => DecodedUnit::Structured(MessageEvent::from_value(&value)),
            Err(_) => DecodedUnit::Raw(candidate.to_string()),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, DecodedUnit::Structured(_))
    }

    pub fn into_event(self) -> MessageEvent {
        match self {
            DecodedUnit::Structured(event) => event,
            DecodedUnit::Raw(text) => MessageEvent::raw(text),
        }
    }
}
