//! LLM-related primitive types.
//!
//! Pure data types for model calls. Traits and orchestration live in shiftdesk-llm.

use crate::{ConversationMessage, NoteEditKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// TOOL CALLING
// ============================================================================

/// A structured tool call produced by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned call id, echoed back with the tool result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Operation name; blank names are rejected by the retry protocol
    pub name: String,
    /// Argument object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: serde_json::Value,
}

/// Token usage reported by a provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

/// Input of a single model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Ask the provider to force a tool call when it supports it
    #[serde(default)]
    pub require_tool_call: bool,
}

impl ModelRequest {
    /// Plain completion without tools.
    pub fn completion(messages: Vec<ConversationMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            require_tool_call: false,
        }
    }

    /// Tool-calling request that requires a structured call.
    pub fn tool_call(messages: Vec<ConversationMessage>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            messages,
            tools,
            require_tool_call: true,
        }
    }

    /// Content of the leading system message, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == crate::MessageRole::System)
            .map(|m| m.content.as_str())
    }
}

/// Output of a single model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Free text content
    #[serde(default)]
    pub content: String,
    /// `None` when the response carried no tool call field at all,
    /// `Some(vec![])` when it carried an empty list
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolInvocation>>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// Text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: None,
            usage: None,
        }
    }

    /// Response carrying tool calls.
    pub fn with_tool_calls(tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: String::new(),
            tool_calls: Some(tool_calls),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

// ============================================================================
// STRUCTURED NOTE EDITS
// ============================================================================

/// One operation of a note rewrite. Keep + add operations, in order, form the
/// new text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEditOperation {
    #[serde(rename = "type")]
    pub kind: NoteEditKind,
    pub text: String,
}

impl NoteEditOperation {
    pub fn new(kind: NoteEditKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Reassemble the updated text from edit operations.
pub fn apply_note_edits(operations: &[NoteEditOperation]) -> String {
    operations
        .iter()
        .filter(|op| op.kind != NoteEditKind::Remove)
        .map(|op| op.text.as_str())
        .collect()
}

/// Reassemble the previous text from edit operations.
pub fn original_from_note_edits(operations: &[NoteEditOperation]) -> String {
    operations
        .iter()
        .filter(|op| op.kind != NoteEditKind::Add)
        .map(|op| op.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_edits() -> Vec<NoteEditOperation> {
        vec![
            NoteEditOperation::new(NoteEditKind::Keep, "We "),
            NoteEditOperation::new(NoteEditKind::Remove, "were working"),
            NoteEditOperation::new(NoteEditKind::Add, "are working"),
            NoteEditOperation::new(NoteEditKind::Keep, " on the project yesterday"),
            NoteEditOperation::new(NoteEditKind::Add, " and made good progress"),
        ]
    }

    #[test]
    fn test_apply_note_edits() {
        assert_eq!(
            apply_note_edits(&sample_edits()),
            "We are working on the project yesterday and made good progress"
        );
        assert_eq!(
            original_from_note_edits(&sample_edits()),
            "We were working on the project yesterday"
        );
    }

    #[test]
    fn test_note_edit_wire_shape() {
        let json = serde_json::to_value(&sample_edits()[1]).unwrap();
        assert_eq!(json, json!({"type": "remove", "text": "were working"}));
    }

    #[test]
    fn test_model_response_distinguishes_missing_and_empty_calls() {
        let missing: ModelResponse = serde_json::from_value(json!({"content": "hi"})).unwrap();
        assert_eq!(missing.tool_calls, None);
        let empty: ModelResponse =
            serde_json::from_value(json!({"content": "", "tool_calls": []})).unwrap();
        assert_eq!(empty.tool_calls, Some(vec![]));
    }

    #[test]
    fn test_system_prompt_accessor() {
        let request = ModelRequest::completion(vec![
            ConversationMessage::system("be brief"),
            ConversationMessage::human("hi"),
        ]);
        assert_eq!(request.system_prompt(), Some("be brief"));
        let request = ModelRequest::completion(vec![ConversationMessage::human("hi")]);
        assert_eq!(request.system_prompt(), None);
    }
}
