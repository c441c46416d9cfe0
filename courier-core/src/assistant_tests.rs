// courier-core/src/assistant_tests.rs
#![cfg(test)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;

use crate::assistant::Assistant;
use crate::auth::ClientCredentialProvider;
use crate::completion::CompletionService;
use crate::config::{Credentials, GraphConfig};
use crate::errors::CompletionError;
use crate::graph::GraphClient;
use crate::models::chat::{ChatMessage, Role};
use crate::prompt::system_prompt;
use crate::tools::catalog;
use async_trait::async_trait;

// --- Scripted Completion Service ---

/// Replays canned replies in order and records every message list it receives.
#[derive(Clone, Default)]
struct ScriptedCompletion {
    replies: Arc<Mutex<VecDeque<Result<String, u16>>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedCompletion {
    fn new(replies: &[&str]) -> Self {
        let script = Self::default();
        for reply in replies {
            script.push(Ok(reply.to_string()));
        }
        script
    }

    fn push(&self, reply: Result<String, u16>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(CompletionError::BadStatus {
                status,
                body: String::new(),
            }),
            None => Err(CompletionError::MalformedResponse(
                "ScriptedCompletion: no reply left".to_string(),
            )),
        }
    }
}

// --- Test Helpers ---

fn graph_client(server: &MockServer) -> GraphClient {
    let config = GraphConfig {
        base_url: server.url("/v1.0"),
        authority: server.base_url(),
        ..GraphConfig::default()
    };
    let credentials = Credentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        tenant_id: "tenant".to_string(),
    };
    let tokens = Arc::new(ClientCredentialProvider::new(Client::new(), &credentials, &config));
    GraphClient::new(Client::new(), &config, tokens)
}

async fn mock_token(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tenant/oauth2/v2.0/token");
            then.status(200)
                .json_body(json!({ "access_token": "tok", "expires_in": 3600 }));
        })
        .await;
}

fn assistant_with(script: &ScriptedCompletion, server: &MockServer) -> Assistant {
    Assistant::new(Box::new(script.clone()), Box::new(graph_client(server)))
}

fn expected_system_message() -> ChatMessage {
    ChatMessage::system(system_prompt(&catalog()))
}

// --- Assistant Tests ---

#[tokio::test]
async fn test_plain_text_reply_is_returned_verbatim() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let server = MockServer::start_async().await;
    let script = ScriptedCompletion::new(&["Hello! How can I help?"]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("hi").await.unwrap();

    assert_eq!(reply, "Hello! How can I help?");
    assert_eq!(
        assistant.history(),
        &[ChatMessage::user("hi"), ChatMessage::assistant("Hello! How can I help?")]
    );
    let calls = script.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![expected_system_message(), ChatMessage::user("hi")]);
}

#[tokio::test]
async fn test_json_without_tool_key_is_treated_as_text() {
    let server = MockServer::start_async().await;
    let any_request = server
        .mock_async(|_when, then| {
            then.status(500);
        })
        .await;
    let script = ScriptedCompletion::new(&[r#"{"answer": "42"}"#]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("what is the answer?").await.unwrap();

    assert_eq!(reply, r#"{"answer": "42"}"#);
    assert_eq!(assistant.history().len(), 2);
    assert_eq!(script.calls().len(), 1);
    any_request.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_tool_turn_calls_api_once_and_appends_three_messages() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    let messages_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1.0/me/messages")
                .query_param("$top", "5")
                .query_param("$filter", "isRead eq false");
            then.status(200).json_body(json!({ "value": [{
                "subject": "Budget",
                "from": { "emailAddress": { "address": "cfo@example.com" } },
                "receivedDateTime": "2024-05-01T09:30:00Z",
                "bodyPreview": "Numbers attached",
                "isRead": false
            }] }));
        })
        .await;

    let script = ScriptedCompletion::new(&[
        r#"{"tool": "get_emails", "parameters": {"limit": 5, "filter": "unread"}}"#,
        "You have one unread email from cfo@example.com about the budget.",
    ]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("any unread mail?").await.unwrap();

    messages_mock.assert_async().await;
    assert_eq!(reply, "You have one unread email from cfo@example.com about the budget.");

    let history = assistant.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0], ChatMessage::user("any unread mail?"));
    assert_eq!(history[1], ChatMessage::assistant("[Used tool: get_emails]"));
    assert_eq!(history[2].role, Role::User);
    assert!(history[2].content.starts_with("Tool result: {"));
    assert!(history[2].content.contains("\"from\": \"cfo@example.com\""));
    assert!(history[2]
        .content
        .ends_with("Please summarize this information in a clear, friendly way for the user."));
    assert_eq!(history[3], ChatMessage::assistant(reply.clone()));

    let calls = script.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1][0], expected_system_message());
    assert_eq!(&calls[1][1..], &history[..3]);
}

#[tokio::test]
async fn test_unknown_tool_is_reported_back_without_remote_calls() {
    let server = MockServer::start_async().await;
    let any_request = server
        .mock_async(|_when, then| {
            then.status(500);
        })
        .await;
    let script = ScriptedCompletion::new(&[
        r#"{"tool": "foo", "parameters": {"bar": 1}}"#,
        "Sorry, I can't do that.",
    ]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("do foo").await.unwrap();

    any_request.assert_hits_async(0).await;
    assert_eq!(reply, "Sorry, I can't do that.");
    let history = assistant.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1], ChatMessage::assistant("[Used tool: foo]"));

    let second_call = &script.calls()[1];
    let tool_message = &second_call[second_call.len() - 1];
    let payload = tool_message
        .content
        .strip_prefix("Tool result: ")
        .and_then(|rest| rest.split("\n\n").next())
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(parsed, json!({ "error": "Unknown function: foo" }));
}

#[tokio::test]
async fn test_missing_parameter_becomes_error_result() {
    let server = MockServer::start_async().await;
    let any_request = server
        .mock_async(|_when, then| {
            then.status(500);
        })
        .await;
    let script = ScriptedCompletion::new(&[
        r#"{"tool": "send_email", "parameters": {"to": "a@example.com"}}"#,
        "I need a subject and body to send that.",
    ]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("email a@example.com").await.unwrap();

    any_request.assert_hits_async(0).await;
    assert_eq!(reply, "I need a subject and body to send that.");
    assert!(assistant.history()[2]
        .content
        .contains("\"error\": \"Missing required parameter 'subject'\""));
}

#[tokio::test]
async fn test_badly_shaped_tool_call_is_narrated() {
    let server = MockServer::start_async().await;
    let any_request = server
        .mock_async(|_when, then| {
            then.status(500);
        })
        .await;
    let script = ScriptedCompletion::new(&[
        r#"{"tool": "get_emails", "parameters": "unread"}"#,
        "I couldn't read that request, could you rephrase it?",
        r#"{"tool": 7, "parameters": {}}"#,
        "That isn't something I can do.",
    ]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("unread mail").await.unwrap();
    assert_eq!(reply, "I couldn't read that request, could you rephrase it?");
    let history = assistant.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1], ChatMessage::assistant("[Used tool: get_emails]"));
    assert!(history[2]
        .content
        .contains("\"error\": \"Invalid value for parameter 'parameters': expected an object, got \\\"unread\\\"\""));

    let reply = assistant.process("do seven").await.unwrap();
    assert_eq!(reply, "That isn't something I can do.");
    assert!(assistant.history()[6]
        .content
        .contains("\"error\": \"Unknown function: 7\""));

    any_request.assert_hits_async(0).await;
    let calls = script.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[1].last(), Some(&assistant.history()[2]));
}

#[tokio::test]
async fn test_upstream_failure_is_narrated() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/planner/plans");
            then.status(200).json_body(json!({ "value": [] }));
        })
        .await;
    let script = ScriptedCompletion::new(&[
        r#"{"tool": "get_tasks", "parameters": {}}"#,
        "You don't have any Planner plans yet.",
    ]);
    let mut assistant = assistant_with(&script, &server);

    let reply = assistant.process("show my tasks").await.unwrap();

    assert_eq!(reply, "You don't have any Planner plans yet.");
    assert!(assistant.history()[2]
        .content
        .contains("\"error\": \"No plans found\""));
}

#[tokio::test]
async fn test_clear_resets_history_for_next_turn() {
    let server = MockServer::start_async().await;
    let script = ScriptedCompletion::new(&["First answer", "Second answer"]);
    let mut assistant = assistant_with(&script, &server);

    assistant.process("first question").await.unwrap();
    assistant.clear();
    assert!(assistant.history().is_empty());

    assistant.process("second question").await.unwrap();

    let calls = script.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        vec![expected_system_message(), ChatMessage::user("second question")]
    );
}

#[tokio::test]
async fn test_completion_failure_aborts_turn() {
    let server = MockServer::start_async().await;
    let script = ScriptedCompletion::default();
    script.push(Err(503));
    let mut assistant = assistant_with(&script, &server);

    let err = assistant.process("hello?").await.unwrap_err();

    assert!(matches!(err, CompletionError::BadStatus { status: 503, .. }));
    assert_eq!(err.to_string(), "Ollama API error: 503");
    assert_eq!(assistant.history(), &[ChatMessage::user("hello?")]);
}
