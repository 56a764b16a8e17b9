//! SHIFTDESK Core - Data Types
//!
//! Pure data structures shared by every Shiftdesk crate: the client request
//! envelope and its typed payloads, conversation messages, model invocation
//! types, tool context and configuration. No I/O happens in this crate.

pub mod client_request;
pub mod config;
pub mod context;
pub mod dates;
pub mod enums;
pub mod error;
pub mod llm;
pub mod message;
pub mod request;

pub use client_request::{
    lower, ClientRequest, CreateNoteArgs, CurrentShiftArgs, FindNotesArgs, FindTasksArgs,
    NoteRef, ShiftDaysArgs, ShowNotesArgs, TaskComment, TaskFields, TaskRef, UpdateNoteArgs,
};
pub use config::{BackoffConfig, ProviderConfig, ProviderKind, RetryConfig, DEFAULT_FALLBACK_STAGE};
pub use context::ToolContext;
pub use dates::parse_flexible_date;
pub use enums::{
    ActionRequestType, EnumParseError, InfoRequestType, NoteEditKind, RequestKind, TaskPriority,
    TaskStatus, UiActionType,
};
pub use error::{
    ConfigError, EnvelopeError, InvocationError, LlmError, NoteEditError, ShiftdeskError,
    ShiftdeskResult, ToolError,
};
pub use llm::{
    apply_note_edits, original_from_note_edits, ModelRequest, ModelResponse, NoteEditOperation,
    TokenUsage, ToolDefinition, ToolInvocation,
};
pub use message::{ContextWindow, ConversationMessage, MessageRole};
pub use request::{ArgValue, RequestArgs, RequestEnvelope};
