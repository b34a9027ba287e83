use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::openai::{OpenAIMessage, ROLE_SYSTEM};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Body accepted on `POST /api/chat`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub system: Option<String>,
    /// Entries stay raw JSON: whatever `role` and `content` hold is forwarded
    /// as received, multimodal content arrays included.
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

// null, false, 0 and "" don't count as present.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn into_openai_message(entry: Value) -> Option<OpenAIMessage> {
    let Value::Object(mut entry) = entry else {
        return None;
    };
    match (entry.remove("role"), entry.remove("content")) {
        (Some(role), Some(content)) if is_present(&role) && is_present(&content) => {
            Some(OpenAIMessage { role, content })
        }
        _ => None,
    }
}

impl ChatRequest {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// Optional system prompt first, then every complete inbound message in order.
pub fn assemble_messages(
    system: Option<String>,
    messages: Option<Vec<Value>>,
) -> Vec<OpenAIMessage> {
    let system = system
        .filter(|system| !system.is_empty())
        .map(|content| OpenAIMessage {
            role: ROLE_SYSTEM.into(),
            content: content.into(),
        });

    system
        .into_iter()
        .chain(
            messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(into_openai_message),
        )
        .collect()
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub reply: Box<str>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub ok: bool,
}
