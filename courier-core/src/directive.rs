// courier-core/src/directive.rs

//! Decides whether a model reply is conversation or a tool call.

use serde_json::Value as JsonValue;

use crate::models::tools::ToolCall;

/// A classified model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Ordinary conversational text.
    Text(String),
    /// A JSON object with a `tool` key.
    Tool(ToolCall),
    /// Braced text that is not a JSON object or has no `tool` key. Shown to the user as text.
    Malformed(String),
}

/// Classifies `text`.
///
/// A reply that, once trimmed, starts with `{`, ends with `}`, parses as a
/// JSON object and carries a `tool` key is a tool call. A non-string tool name
/// keeps its JSON text so it is reported as an unknown function. `parameters`
/// is passed through untouched and checked when the call is dispatched.
pub fn classify(text: &str) -> Reply {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Reply::Text(text.to_string());
    }

    let mut object = match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Object(object)) => object,
        _ => return Reply::Malformed(text.to_string()),
    };

    let tool = match object.remove("tool") {
        Some(JsonValue::String(tool)) => tool,
        Some(other) => other.to_string(),
        None => return Reply::Malformed(text.to_string()),
    };
    let parameters = object.remove("parameters").unwrap_or(JsonValue::Null);

    Reply::Tool(ToolCall { tool, parameters })
}
