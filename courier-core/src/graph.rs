// courier-core/src/graph.rs

//! Typed client for the four Microsoft Graph operations the assistant uses.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::TokenSource;
use crate::config::GraphConfig;
use crate::errors::{GraphError, Operation};
use crate::models::graph::{
    Collection, CreatedTask, GraphEntity, GraphMessage, MessageList, MessageSummary,
    PlannerTask, SendReceipt, TaskList, TaskSummary,
};

pub const PREVIEW_CHARS: usize = 100;
pub const DEFAULT_PRIORITY: u32 = 5;
const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Server-side mail filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailFilter {
    Unread,
    From(String),
}

impl MailFilter {
    /// Parses `unread` or `from:<address>`. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("unread") {
            return Some(MailFilter::Unread);
        }
        raw.strip_prefix("from:")
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(|addr| MailFilter::From(addr.to_string()))
    }

    fn odata(&self) -> String {
        match self {
            MailFilter::Unread => "isRead eq false".to_string(),
            // OData string literals escape a quote by doubling it.
            MailFilter::From(addr) => {
                format!("from/emailAddress/address eq '{}'", addr.replace('\'', "''"))
            }
        }
    }
}

/// Client-side task filter, applied after the tasks are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    Incomplete,
    /// Incomplete and due within the next week, overdue tasks included.
    DueSoon,
}

impl TaskFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "incomplete" => Some(TaskFilter::Incomplete),
            "due_soon" => Some(TaskFilter::DueSoon),
            _ => None,
        }
    }

    pub fn retains(&self, task: &TaskSummary, now: DateTime<Utc>) -> bool {
        let incomplete = task.percent_complete < 100;
        match self {
            TaskFilter::Incomplete => incomplete,
            TaskFilter::DueSoon => {
                let due = task
                    .due_date
                    .as_deref()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok());
                match due {
                    Some(due) => {
                        incomplete
                            && due.with_timezone(&Utc) <= now + Duration::days(DUE_SOON_WINDOW_DAYS)
                    }
                    None => false,
                }
            }
        }
    }
}

/// Input for [`Productivity::create_task`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub plan_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// The remote operations a tool call can reach.
#[async_trait]
pub trait Productivity: Send + Sync {
    async fn list_messages(
        &self,
        limit: u32,
        filter: Option<&MailFilter>,
    ) -> Result<MessageList, GraphError>;

    async fn send_message(&self, to: &str, subject: &str, body: &str)
        -> Result<SendReceipt, GraphError>;

    async fn list_tasks(
        &self,
        plan_id: Option<&str>,
        filter: Option<TaskFilter>,
    ) -> Result<TaskList, GraphError>;

    async fn create_task(&self, task: &NewTask) -> Result<CreatedTask, GraphError>;
}

/// Microsoft Graph implementation of [`Productivity`].
pub struct GraphClient {
    http_client: Client,
    base_url: String,
    principal: String,
    tokens: Arc<dyn TokenSource>,
}

impl GraphClient {
    pub fn new(http_client: Client, config: &GraphConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            principal: config.principal_path(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: Operation,
    ) -> Result<reqwest::Response, GraphError> {
        let headers = self.tokens.auth_headers().await?;
        request
            .headers(headers)
            .send()
            .await
            .map_err(|source| GraphError::Transport { operation, source })
    }

    async fn expect_json<T: DeserializeOwned>(
        response: reqwest::Response,
        expected: StatusCode,
        operation: Operation,
    ) -> Result<T, GraphError> {
        let status = response.status();
        if status != expected {
            debug!(%operation, status = status.as_u16(), "Graph request failed.");
            return Err(GraphError::Upstream {
                operation,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| GraphError::Decode { operation, source })
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation: Operation,
    ) -> Result<Vec<T>, GraphError> {
        let request = self.http_client.get(self.url(path)).query(query);
        let response = self.send(request, operation).await?;
        let page: Collection<T> = Self::expect_json(response, StatusCode::OK, operation).await?;
        Ok(page.value)
    }

    async fn first_plan_id(&self) -> Result<String, GraphError> {
        let path = format!("{}/planner/plans", self.principal);
        let plans: Vec<GraphEntity> = self.get_collection(&path, &[], Operation::ListPlans).await?;
        plans
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or(GraphError::NoPlansFound)
    }

    async fn first_bucket_id(&self, plan_id: &str) -> Result<String, GraphError> {
        let path = format!("planner/plans/{}/buckets", plan_id);
        let buckets: Vec<GraphEntity> = self
            .get_collection(&path, &[], Operation::ListBuckets)
            .await?;
        buckets
            .into_iter()
            .next()
            .map(|b| b.id)
            .ok_or(GraphError::NoBucketsFound)
    }

    async fn attach_description(&self, task_id: &str, description: &str) -> Result<(), GraphError> {
        let operation = Operation::UpdateTaskDetails;
        let request = self
            .http_client
            .patch(self.url(&format!("planner/tasks/{}/details", task_id)))
            .json(&json!({ "description": description }));
        let response = self.send(request, operation).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GraphError::Upstream {
                operation,
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Productivity for GraphClient {
    async fn list_messages(
        &self,
        limit: u32,
        filter: Option<&MailFilter>,
    ) -> Result<MessageList, GraphError> {
        let mut query = vec![
            ("$top", limit.to_string()),
            ("$orderby", "receivedDateTime DESC".to_string()),
        ];
        if let Some(filter) = filter {
            query.push(("$filter", filter.odata()));
        }
        let path = format!("{}/messages", self.principal);
        let messages: Vec<GraphMessage> = self
            .get_collection(&path, &query, Operation::ListMessages)
            .await?;

        let emails: Vec<MessageSummary> = messages.into_iter().map(MessageSummary::from).collect();
        info!(count = emails.len(), "Retrieved emails.");
        Ok(MessageList {
            count: emails.len(),
            emails,
        })
    }

    async fn send_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, GraphError> {
        let operation = Operation::SendMessage;
        let payload = json!({
            "message": {
                "subject": subject,
                "body": {
                    "contentType": "Text",
                    "content": body
                },
                "toRecipients": [
                    { "emailAddress": { "address": to } }
                ]
            }
        });
        let request = self
            .http_client
            .post(self.url(&format!("{}/sendMail", self.principal)))
            .json(&payload);
        let response = self.send(request, operation).await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(GraphError::Upstream {
                operation,
                status: status.as_u16(),
            });
        }
        info!(%to, "Sent email.");
        Ok(SendReceipt {
            status: "success".to_string(),
            message: format!("Email sent to {}", to),
        })
    }

    async fn list_tasks(
        &self,
        plan_id: Option<&str>,
        filter: Option<TaskFilter>,
    ) -> Result<TaskList, GraphError> {
        let plan_id = match plan_id {
            Some(id) => id.to_string(),
            None => {
                let id = self.first_plan_id().await?;
                debug!(plan_id = %id, "No plan given, using the first plan.");
                id
            }
        };

        let path = format!("planner/plans/{}/tasks", plan_id);
        let tasks: Vec<PlannerTask> = self
            .get_collection(&path, &[], Operation::ListTasks)
            .await?;

        let now = Utc::now();
        let tasks: Vec<TaskSummary> = tasks
            .into_iter()
            .map(TaskSummary::from)
            .filter(|t| filter.map_or(true, |f| f.retains(t, now)))
            .collect();
        info!(count = tasks.len(), %plan_id, "Retrieved tasks.");
        Ok(TaskList {
            count: tasks.len(),
            plan_id,
            tasks,
        })
    }

    async fn create_task(&self, task: &NewTask) -> Result<CreatedTask, GraphError> {
        let bucket_id = self.first_bucket_id(&task.plan_id).await?;

        let mut payload = json!({
            "planId": task.plan_id,
            "bucketId": bucket_id,
            "title": task.title,
        });
        if let Some(due) = task.due_date {
            payload["dueDateTime"] = json!(format!("{}T00:00:00Z", due.format("%Y-%m-%d")));
        }

        let operation = Operation::CreateTask;
        let request = self.http_client.post(self.url("planner/tasks")).json(&payload);
        let response = self.send(request, operation).await?;
        let created: PlannerTask =
            Self::expect_json(response, StatusCode::CREATED, operation).await?;
        info!(task_id = %created.id, "Created task.");

        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            // The task already exists at this point; a failed details update
            // is reported in the log only.
            if let Err(e) = self.attach_description(&created.id, description).await {
                warn!(task_id = %created.id, error = %e, "Task created but its description was not saved.");
            }
        }

        Ok(CreatedTask {
            status: "success".to_string(),
            task_id: created.id,
            title: created.title,
        })
    }
}
