//! SHIFTDESK Tools - Task, Shift and Note Tools
//!
//! The tools the assistant model may call. Each tool publishes a
//! [`ToolDefinition`](shiftdesk_core::ToolDefinition) and, when invoked,
//! parses the model's arguments into a typed
//! [`ClientRequest`](shiftdesk_core::ClientRequest) and lowers it into the
//! client envelope:
//! - Tasks: create, find, update, delete, comment
//! - Shifts: assignments, logs, current shift, clock in/out, shifts page
//! - Notes: create, update (via generated edit operations), find, share, delete, show

pub mod catalog;
pub mod executor;
pub mod notes;
pub mod shifts;
pub mod tasks;

pub use catalog::{catalog, ToolName};
pub use executor::{ToolExecutor, ToolOutput};
pub use notes::{InMemoryNoteSource, NoteSource, UpdateNoteRequest};
