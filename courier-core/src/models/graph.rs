// courier-core/src/models/graph.rs
//! Compact result records returned to the model, plus the slices of the raw
//! Graph payloads they are built from.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageSummary {
    pub subject: String,
    pub from: String,
    #[serde(rename = "received")]
    pub received_at: String,
    #[serde(rename = "preview")]
    pub preview_text: String,
    pub is_read: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageList {
    pub count: usize,
    pub emails: Vec<MessageSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub status: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub percent_complete: u32,
    pub due_date: Option<String>,
    pub priority: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskList {
    pub count: usize,
    pub plan_id: String,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub status: String,
    pub task_id: String,
    pub title: String,
}

// --- Raw Graph payloads ---

#[derive(Deserialize, Debug)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphMessage {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<GraphRecipient>,
    #[serde(default)]
    pub received_date_time: Option<String>,
    #[serde(default)]
    pub body_preview: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphRecipient {
    pub email_address: GraphEmailAddress,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GraphEmailAddress {
    #[serde(default)]
    pub address: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GraphEntity {
    pub id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlannerTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub percent_complete: u32,
    #[serde(default)]
    pub due_date_time: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
}

impl From<GraphMessage> for MessageSummary {
    fn from(msg: GraphMessage) -> Self {
        Self {
            subject: msg.subject.unwrap_or_default(),
            from: msg.from.map(|r| r.email_address.address).unwrap_or_default(),
            received_at: msg.received_date_time.unwrap_or_default(),
            preview_text: msg
                .body_preview
                .unwrap_or_default()
                .chars()
                .take(crate::graph::PREVIEW_CHARS)
                .collect(),
            is_read: msg.is_read,
        }
    }
}

impl From<PlannerTask> for TaskSummary {
    fn from(task: PlannerTask) -> Self {
        Self {
            id: task.id,
            title: task.title,
            percent_complete: task.percent_complete,
            due_date: task.due_date_time,
            priority: task.priority.unwrap_or(crate::graph::DEFAULT_PRIORITY),
        }
    }
}
