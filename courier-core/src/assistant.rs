// courier-core/src/assistant.rs

//! The request loop: one user turn in, one reply out, with at most one tool
//! round-trip in between.

use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::completion::CompletionService;
use crate::directive::{classify, Reply};
use crate::errors::CompletionError;
use crate::graph::Productivity;
use crate::models::chat::ChatMessage;
use crate::models::tools::{ToolDescriptor, ToolResult};
use crate::prompt::system_prompt;
use crate::tools::{catalog, dispatch};

const SUMMARY_REQUEST: &str =
    "Please summarize this information in a clear, friendly way for the user.";

/// Owns the conversation and mediates between the model and the tools.
pub struct Assistant {
    session_id: Uuid,
    completion: Box<dyn CompletionService>,
    productivity: Box<dyn Productivity>,
    tools: Vec<ToolDescriptor>,
    history: Vec<ChatMessage>,
}

impl Assistant {
    pub fn new(completion: Box<dyn CompletionService>, productivity: Box<dyn Productivity>) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, "Created assistant session.");
        Self {
            session_id,
            completion,
            productivity,
            tools: catalog(),
            history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The transcript so far, without the system prompt.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        info!(session_id = %self.session_id, dropped = self.history.len(), "Clearing conversation history.");
        self.history.clear();
    }

    /// Processes one user request and returns the text to show the user.
    ///
    /// Errors only when the completion service fails; tool failures are
    /// narrated by the model like any other tool result.
    pub async fn process(&mut self, user_input: &str) -> Result<String, CompletionError> {
        let span = info_span!("turn", session_id = %self.session_id);
        self.process_turn(user_input).instrument(span).await
    }

    async fn process_turn(&mut self, user_input: &str) -> Result<String, CompletionError> {
        self.history.push(ChatMessage::user(user_input));

        let response = self.complete().await?;
        let call = match classify(&response) {
            Reply::Tool(call) => call,
            Reply::Text(text) => return Ok(self.finish(text)),
            Reply::Malformed(text) => {
                debug!("Reply looked like a tool call but was not one; treating it as text.");
                return Ok(self.finish(text));
            }
        };

        info!(tool = %call.tool, "Model requested a tool call.");
        let result = dispatch(&call, self.productivity.as_ref()).await;
        if let ToolResult::Failed(e) = &result {
            warn!(tool = %call.tool, error = %e, "Tool call failed; passing the error to the model.");
        }

        let rendered = serde_json::to_string_pretty(&result.to_json())
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        trace!(result = %rendered, "Tool result");

        self.history
            .push(ChatMessage::assistant(format!("[Used tool: {}]", call.tool)));
        self.history.push(ChatMessage::user(format!(
            "Tool result: {}\n\n{}",
            rendered, SUMMARY_REQUEST
        )));

        let final_response = self.complete().await?;
        Ok(self.finish(final_response))
    }

    async fn complete(&self) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::system(system_prompt(&self.tools)));
        messages.extend(self.history.iter().cloned());
        debug!(num_messages = messages.len(), "Requesting completion.");
        self.completion.complete(&messages).await
    }

    fn finish(&mut self, text: String) -> String {
        self.history.push(ChatMessage::assistant(text.clone()));
        text
    }
}
