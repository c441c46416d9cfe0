// courier-core/src/models/tools.rs
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::graph::{CreatedTask, MessageList, SendReceipt, TaskList};
use crate::errors::ToolError;

/// Describes a tool to the model. Only used to render the system prompt.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameter name and its human-readable description, in display order.
    pub parameters: Vec<(String, String)>,
}

/// A tool invocation parsed out of a model reply.
///
/// `parameters` is kept as the raw JSON value; it is checked when the call is
/// mapped to a request, so a bad shape becomes a tool error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub parameters: JsonValue,
}

/// Outcome of one tool call, serialised back into the conversation.
#[derive(Debug)]
pub enum ToolResult {
    Emails(MessageList),
    Sent(SendReceipt),
    Tasks(TaskList),
    TaskCreated(CreatedTask),
    Failed(ToolError),
}

impl ToolResult {
    pub fn to_json(&self) -> JsonValue {
        let value = match self {
            ToolResult::Emails(list) => serde_json::to_value(list),
            ToolResult::Sent(receipt) => serde_json::to_value(receipt),
            ToolResult::Tasks(list) => serde_json::to_value(list),
            ToolResult::TaskCreated(task) => serde_json::to_value(task),
            ToolResult::Failed(err) => Ok(serde_json::json!({ "error": err.to_string() })),
        };
        value.unwrap_or_else(|e| serde_json::json!({ "error": format!("Failed to serialise tool result: {}", e) }))
    }
}

impl From<Result<ToolResult, ToolError>> for ToolResult {
    fn from(result: Result<ToolResult, ToolError>) -> Self {
        result.unwrap_or_else(ToolResult::Failed)
    }
}
