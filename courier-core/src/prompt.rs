// courier-core/src/prompt.rs
use crate::models::tools::ToolDescriptor;

/// Builds the system prompt: tool catalog, calling convention and examples.
pub fn system_prompt(tools: &[ToolDescriptor]) -> String {
    let tools_desc = tools
        .iter()
        .map(|tool| {
            let params = tool
                .parameters
                .iter()
                .map(|(name, desc)| format!("    - {}: {}", name, desc))
                .collect::<Vec<_>>()
                .join("\n");
            format!("- {}: {}\n{}", tool.name, tool.description, params)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful personal assistant with access to Microsoft 365.
You can help manage emails and Planner tasks.

Available tools:
{tools_desc}

When you need to use a tool, respond ONLY with a JSON object in this format:
{{"tool": "tool_name", "parameters": {{"param1": "value1", "param2": "value2"}}}}

If you don't need a tool, respond normally in a friendly, concise way.
Format information clearly for CLI display.

Examples:
User: "Show me my emails"
Assistant: {{"tool": "get_emails", "parameters": {{"limit": 10}}}}

User: "What's the weather?"
Assistant: I can help you with emails and tasks from Microsoft 365, but I don't have access to weather information.
"#
    )
}
