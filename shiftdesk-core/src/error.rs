//! Error types for Shiftdesk operations

use crate::RequestKind;
use thiserror::Error;

/// Client request envelope errors.
///
/// These are contract violations raised by tool definitions, never recovered
/// by the retry protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Invalid subtype '{subtype}' for {kind:?} request")]
    InvalidSubtype { kind: RequestKind, subtype: String },

    #[error("show_only is only allowed on info requests, got {kind:?}")]
    ShowOnlyNotAllowed { kind: RequestKind },

    #[error("Unknown request type: {request_type}")]
    UnknownRequestType { request_type: String },

    #[error("Missing subtype field {field} for {kind:?} request")]
    MissingSubtype { kind: RequestKind, field: String },

    #[error("Malformed envelope: {reason}")]
    Malformed { reason: String },
}

/// Reasons a model response was not a usable tool invocation.
///
/// Every variant is recoverable inside the retry loop; its description is fed
/// back to the model on the next attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("no tool call was made")]
    NoInvocationProduced,

    #[error("empty tool calls array")]
    EmptyInvocationList,

    #[error("tool call missing required information: {reason}")]
    IncompleteInvocation { reason: String },

    #[error("exception during tool call: {message}")]
    TransportException { message: String },
}

impl InvocationError {
    /// Short taxonomy tag, stable for logs and failure reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NoInvocationProduced => "no_invocation_produced",
            Self::EmptyInvocationList => "empty_invocation_list",
            Self::IncompleteInvocation { .. } => "incomplete_invocation",
            Self::TransportException { .. } => "transport_exception",
        }
    }

    /// Whether the failure came from the call itself rather than its output.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportException { .. })
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },
}

/// Tool execution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool {tool} is not available: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("Note not found: {note_id}")]
    NoteNotFound { note_id: String },
}

/// Structured note-edit generation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NoteEditError {
    #[error("Could not produce note edits after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },

    #[error("Note edit generation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Master error type for all Shiftdesk errors.
#[derive(Debug, Clone, Error)]
pub enum ShiftdeskError {
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Note edit error: {0}")]
    NoteEdit(#[from] NoteEditError),
}

/// Result type alias for Shiftdesk operations.
pub type ShiftdeskResult<T> = Result<T, ShiftdeskError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_display_invalid_subtype() {
        let err = EnvelopeError::InvalidSubtype {
            kind: RequestKind::Info,
            subtype: "create_task".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid subtype"));
        assert!(msg.contains("create_task"));
        assert!(msg.contains("Info"));
    }

    #[test]
    fn test_invocation_error_descriptions_match_feedback_wording() {
        assert_eq!(
            InvocationError::NoInvocationProduced.to_string(),
            "no tool call was made"
        );
        assert_eq!(
            InvocationError::EmptyInvocationList.to_string(),
            "empty tool calls array"
        );
        let incomplete = InvocationError::IncompleteInvocation {
            reason: "blank name".to_string(),
        };
        assert!(incomplete
            .to_string()
            .starts_with("tool call missing required information"));
        let transport = InvocationError::TransportException {
            message: "connection reset".to_string(),
        };
        assert!(transport.to_string().contains("connection reset"));
    }

    #[test]
    fn test_invocation_error_tags() {
        assert_eq!(InvocationError::NoInvocationProduced.tag(), "no_invocation_produced");
        assert_eq!(InvocationError::EmptyInvocationList.tag(), "empty_invocation_list");
        assert!(InvocationError::TransportException {
            message: String::new()
        }
        .is_transport());
        assert!(!InvocationError::EmptyInvocationList.is_transport());
    }

    #[test]
    fn test_llm_error_display_rate_limited() {
        let err = LlmError::RateLimited {
            provider: "openai".to_string(),
            retry_after_ms: 1500,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Rate limited"));
        assert!(msg.contains("openai"));
        assert!(msg.contains("1500"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "retry.max_retries".to_string(),
            reason: "must be > 0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("retry.max_retries"));
        assert!(msg.contains("must be > 0"));
    }

    #[test]
    fn test_shiftdesk_error_from_variants() {
        let envelope = ShiftdeskError::from(EnvelopeError::Malformed {
            reason: "x".to_string(),
        });
        assert!(matches!(envelope, ShiftdeskError::Envelope(_)));

        let invocation = ShiftdeskError::from(InvocationError::EmptyInvocationList);
        assert!(matches!(invocation, ShiftdeskError::Invocation(_)));

        let llm = ShiftdeskError::from(LlmError::ProviderNotConfigured);
        assert!(matches!(llm, ShiftdeskError::Llm(_)));

        let tool = ShiftdeskError::from(ToolError::UnknownTool {
            name: "x".to_string(),
        });
        assert!(matches!(tool, ShiftdeskError::Tool(_)));

        let config = ShiftdeskError::from(ConfigError::ProviderNotSupported {
            provider: "groq".to_string(),
        });
        assert!(matches!(config, ShiftdeskError::Config(_)));
    }
}
