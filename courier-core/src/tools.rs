// courier-core/src/tools.rs

//! The fixed tool catalog and the typed mapping from a parsed [`ToolCall`]
//! to a productivity API operation.

use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::errors::ToolError;
use crate::graph::{MailFilter, NewTask, Productivity, TaskFilter};
use crate::models::tools::{ToolCall, ToolDescriptor, ToolResult};

pub const DEFAULT_EMAIL_LIMIT: u32 = 10;

/// Every tool the assistant can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    GetEmails,
    SendEmail,
    GetTasks,
    CreateTask,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GetEmails,
        ToolKind::SendEmail,
        ToolKind::GetTasks,
        ToolKind::CreateTask,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GetEmails => "get_emails",
            ToolKind::SendEmail => "send_email",
            ToolKind::GetTasks => "get_tasks",
            ToolKind::CreateTask => "create_task",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let (description, parameters): (&str, &[(&str, &str)]) = match self {
            ToolKind::GetEmails => (
                "Retrieve emails from Outlook inbox. Returns list of recent emails.",
                &[
                    ("limit", "Number of emails to retrieve (default 10)"),
                    (
                        "filter",
                        "Filter criteria: 'unread' for unread emails, 'from:email@example.com' for specific sender",
                    ),
                ],
            ),
            ToolKind::SendEmail => (
                "Send an email via Outlook",
                &[
                    ("to", "Recipient email address (required)"),
                    ("subject", "Email subject (required)"),
                    ("body", "Email body content (required)"),
                ],
            ),
            ToolKind::GetTasks => (
                "Retrieve tasks from Microsoft Planner",
                &[
                    (
                        "plan_id",
                        "Planner plan ID (optional, will use first plan if not provided)",
                    ),
                    (
                        "filter",
                        "Filter: 'incomplete' for incomplete tasks, 'due_soon' for tasks due soon",
                    ),
                ],
            ),
            ToolKind::CreateTask => (
                "Create a new task in Microsoft Planner",
                &[
                    ("plan_id", "Planner plan ID (required)"),
                    ("title", "Task title (required)"),
                    ("description", "Task description (optional)"),
                    ("due_date", "Due date in YYYY-MM-DD format (optional)"),
                ],
            ),
        };
        ToolDescriptor {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters: parameters
                .iter()
                .map(|(name, desc)| (name.to_string(), desc.to_string()))
                .collect(),
        }
    }
}

/// Descriptors for the whole catalog, in prompt order.
pub fn catalog() -> Vec<ToolDescriptor> {
    ToolKind::ALL.into_iter().map(ToolKind::descriptor).collect()
}

/// A tool call whose parameters have been checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    GetEmails {
        limit: u32,
        filter: Option<MailFilter>,
    },
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
    GetTasks {
        plan_id: Option<String>,
        filter: Option<TaskFilter>,
    },
    CreateTask(NewTask),
}

impl ToolRequest {
    pub fn from_call(call: &ToolCall) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(&call.tool)
            .ok_or_else(|| ToolError::UnknownTool(call.tool.clone()))?;
        let empty = Map::new();
        let params = match &call.parameters {
            JsonValue::Null => Params(&empty),
            JsonValue::Object(map) => Params(map),
            other => {
                return Err(ToolError::invalid(
                    "parameters",
                    format!("expected an object, got {}", other),
                ))
            }
        };

        let request = match kind {
            ToolKind::GetEmails => {
                let limit = params.positive_int("limit")?.unwrap_or(DEFAULT_EMAIL_LIMIT);
                let filter = params.optional_str("filter")?.and_then(|raw| {
                    let parsed = MailFilter::parse(raw);
                    if parsed.is_none() {
                        warn!(filter = %raw, "Ignoring unrecognised email filter.");
                    }
                    parsed
                });
                ToolRequest::GetEmails { limit, filter }
            }
            ToolKind::SendEmail => ToolRequest::SendEmail {
                to: params.required_str("to")?.to_string(),
                subject: params.required_str("subject")?.to_string(),
                body: params.required_str("body")?.to_string(),
            },
            ToolKind::GetTasks => {
                let filter = params.optional_str("filter")?.and_then(|raw| {
                    let parsed = TaskFilter::parse(raw);
                    if parsed.is_none() {
                        warn!(filter = %raw, "Ignoring unrecognised task filter.");
                    }
                    parsed
                });
                ToolRequest::GetTasks {
                    plan_id: params.optional_str("plan_id")?.map(str::to_string),
                    filter,
                }
            }
            ToolKind::CreateTask => {
                let due_date = params
                    .optional_str("due_date")?
                    .map(|raw| {
                        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                            ToolError::invalid("due_date", format!("expected YYYY-MM-DD, got '{}'", raw))
                        })
                    })
                    .transpose()?;
                ToolRequest::CreateTask(NewTask {
                    plan_id: params.required_str("plan_id")?.to_string(),
                    title: params.required_str("title")?.to_string(),
                    description: params.optional_str("description")?.map(str::to_string),
                    due_date,
                })
            }
        };
        Ok(request)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolRequest::GetEmails { .. } => ToolKind::GetEmails,
            ToolRequest::SendEmail { .. } => ToolKind::SendEmail,
            ToolRequest::GetTasks { .. } => ToolKind::GetTasks,
            ToolRequest::CreateTask(_) => ToolKind::CreateTask,
        }
    }

    /// Runs the request. Remote failures come back as [`ToolResult::Failed`].
    pub async fn execute(&self, api: &dyn Productivity) -> ToolResult {
        debug!(tool = self.kind().name(), "Executing tool request.");
        let result = match self {
            ToolRequest::GetEmails { limit, filter } => api
                .list_messages(*limit, filter.as_ref())
                .await
                .map(ToolResult::Emails),
            ToolRequest::SendEmail { to, subject, body } => api
                .send_message(to, subject, body)
                .await
                .map(ToolResult::Sent),
            ToolRequest::GetTasks { plan_id, filter } => api
                .list_tasks(plan_id.as_deref(), *filter)
                .await
                .map(ToolResult::Tasks),
            ToolRequest::CreateTask(task) => api
                .create_task(task)
                .await
                .map(ToolResult::TaskCreated),
        };
        result.map_err(ToolError::from).into()
    }
}

/// Parses and runs a tool call, folding every failure into the result.
pub async fn dispatch(call: &ToolCall, api: &dyn Productivity) -> ToolResult {
    match ToolRequest::from_call(call) {
        Ok(request) => request.execute(api).await,
        Err(e) => {
            warn!(tool = %call.tool, error = %e, "Tool call rejected before reaching the API.");
            ToolResult::Failed(e)
        }
    }
}

struct Params<'a>(&'a Map<String, JsonValue>);

impl<'a> Params<'a> {
    fn get(&self, name: &str) -> Option<&'a JsonValue> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn optional_str(&self, name: &'static str) -> Result<Option<&'a str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ToolError::invalid(name, format!("expected a string, got {}", other))),
        }
    }

    fn required_str(&self, name: &'static str) -> Result<&'a str, ToolError> {
        self.optional_str(name)?
            .ok_or(ToolError::MissingParameter(name))
    }

    /// Accepts a JSON integer or a numeric string; zero and negatives are rejected.
    fn positive_int(&self, name: &'static str) -> Result<Option<u32>, ToolError> {
        let value = match self.get(name) {
            None => return Ok(None),
            Some(JsonValue::Number(n)) => n.as_i64(),
            Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(n) if n > 0 => u32::try_from(n)
                .map(Some)
                .map_err(|_| ToolError::invalid(name, "value is too large")),
            Some(n) => Err(ToolError::invalid(name, format!("must be positive, got {}", n))),
            None => Err(ToolError::invalid(name, "expected a whole number")),
        }
    }
}
