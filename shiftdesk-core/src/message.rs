//! Conversation messages and history windowing.

use crate::ToolInvocation;
use serde::{Deserialize, Serialize};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    Human,
    Ai,
    Tool,
}

/// A single message of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls made by an AI message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    /// Id of the call a tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ConversationMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Ai, content)
    }

    /// AI message that requested tool calls.
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            tool_calls,
            ..Self::new(MessageRole::Ai, content)
        }
    }

    /// Result of a tool call, usually a serialized client request envelope.
    pub fn tool(content: impl Into<String>, tool_call_id: Option<String>) -> Self {
        Self {
            tool_call_id,
            ..Self::new(MessageRole::Tool, content)
        }
    }
}

/// Trimming policy for the history passed to a model call.
///
/// Keeps the most recent messages: system messages are dropped, the window
/// must end on one of `end_on` and start on `start_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub max_messages: usize,
    pub start_on: MessageRole,
    pub end_on: Vec<MessageRole>,
}

impl ContextWindow {
    /// Window used when asking for a tool call: last 5, human first.
    pub fn tool_caller() -> Self {
        Self {
            max_messages: 5,
            start_on: MessageRole::Human,
            end_on: vec![MessageRole::Human, MessageRole::Ai],
        }
    }

    /// Wider window used by planning prompts: last 10, may end on a tool result.
    pub fn planner() -> Self {
        Self {
            max_messages: 10,
            start_on: MessageRole::Human,
            end_on: vec![MessageRole::Human, MessageRole::Tool, MessageRole::Ai],
        }
    }

    /// Select the window from `messages`. The input is never modified.
    pub fn apply<'a>(&self, messages: &'a [ConversationMessage]) -> Vec<&'a ConversationMessage> {
        let mut kept: Vec<&ConversationMessage> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();

        while kept.last().is_some_and(|m| !self.end_on.contains(&m.role)) {
            kept.pop();
        }

        let skip = kept.len().saturating_sub(self.max_messages);
        let mut window: Vec<&ConversationMessage> = kept.split_off(skip);

        match window.iter().position(|m| m.role == self.start_on) {
            Some(first) => {
                window.drain(..first);
            }
            None => window.clear(),
        }
        window
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::tool_caller()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(window: &[&ConversationMessage]) -> Vec<MessageRole> {
        window.iter().map(|m| m.role).collect()
    }

    #[test]
    fn test_window_keeps_last_messages_starting_on_human() {
        let history = vec![
            ConversationMessage::system("sys"),
            ConversationMessage::human("h1"),
            ConversationMessage::ai("a1"),
            ConversationMessage::human("h2"),
            ConversationMessage::ai("a2"),
            ConversationMessage::tool("t", None),
            ConversationMessage::ai("a3"),
            ConversationMessage::human("h3"),
        ];
        let window = ContextWindow::tool_caller().apply(&history);
        // last five of the non-system messages: h2 a2 t a3 h3
        assert_eq!(
            roles(&window),
            vec![
                MessageRole::Human,
                MessageRole::Ai,
                MessageRole::Tool,
                MessageRole::Ai,
                MessageRole::Human
            ]
        );
        assert_eq!(window[0].content, "h2");
    }

    #[test]
    fn test_window_drops_leading_non_human() {
        let history = vec![
            ConversationMessage::human("h1"),
            ConversationMessage::ai("a1"),
            ConversationMessage::ai("a2"),
            ConversationMessage::human("h2"),
        ];
        let window = ContextWindow {
            max_messages: 3,
            ..ContextWindow::tool_caller()
        }
        .apply(&history);
        assert_eq!(roles(&window), vec![MessageRole::Human]);
        assert_eq!(window[0].content, "h2");
    }

    #[test]
    fn test_window_strips_trailing_tool_messages() {
        let history = vec![
            ConversationMessage::human("h1"),
            ConversationMessage::ai("a1"),
            ConversationMessage::tool("t1", Some("call_1".to_string())),
        ];
        let window = ContextWindow::tool_caller().apply(&history);
        assert_eq!(roles(&window), vec![MessageRole::Human, MessageRole::Ai]);

        let planner = ContextWindow::planner().apply(&history);
        assert_eq!(planner.len(), 3);
    }

    #[test]
    fn test_window_without_human_is_empty() {
        let history = vec![ConversationMessage::ai("a1"), ConversationMessage::system("s")];
        assert!(ContextWindow::tool_caller().apply(&history).is_empty());
    }

    #[test]
    fn test_window_does_not_mutate_input() {
        let history = vec![ConversationMessage::human("h1"), ConversationMessage::ai("a1")];
        let snapshot = history.clone();
        let _ = ContextWindow::tool_caller().apply(&history);
        assert_eq!(history, snapshot);
    }
}
