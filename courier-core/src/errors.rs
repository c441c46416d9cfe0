// courier-core/src/errors.rs
use std::fmt;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required credential variables are unset or empty.
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Errors from acquiring a bearer token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The identity platform answered but refused to issue a token.
    #[error("Authentication failed: {description}")]
    Rejected { description: String },

    #[error("Unexpected token response: {0}")]
    MalformedResponse(String),

    #[error("Access token is not a valid header value")]
    InvalidHeader,
}

/// Errors from the completion endpoint. Any of these aborts the current turn.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Ollama API error: {status}")]
    BadStatus { status: u16, body: String },

    #[error("Unexpected completion response: {0}")]
    MalformedResponse(String),
}

/// The remote step a [`GraphError`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListMessages,
    SendMessage,
    ListPlans,
    ListTasks,
    ListBuckets,
    CreateTask,
    UpdateTaskDetails,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::ListMessages => "retrieve emails",
            Operation::SendMessage => "send email",
            Operation::ListPlans => "retrieve plans",
            Operation::ListTasks => "retrieve tasks",
            Operation::ListBuckets => "retrieve buckets",
            Operation::CreateTask => "create task",
            Operation::UpdateTaskDetails => "update task details",
        };
        f.write_str(text)
    }
}

/// Errors from the productivity API client.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The API answered with a status other than the one the operation expects.
    #[error("Failed to {operation}: {status}")]
    Upstream { operation: Operation, status: u16 },

    #[error("No plans found")]
    NoPlansFound,

    #[error("No buckets found in plan")]
    NoBucketsFound,

    #[error("Failed to {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to {operation}: unexpected response body ({source})")]
    Decode {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors produced while turning a tool call into a result.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("Missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ToolError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ToolError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
