//! Enum types for Shiftdesk client requests and task fields.
//!
//! Every enum here has a fixed wire spelling that the client application
//! matches on; `as_wire_str` / `from_wire_str` are the only conversions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error when parsing an enum from its wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    /// Name of the enum being parsed
    pub enum_name: &'static str,
    /// The rejected input
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.enum_name, self.value)
    }
}

impl std::error::Error for EnumParseError {}

/// Implements `Display`, `FromStr` and an `ALL` listing for a wire enum.
macro_rules! wire_enum {
    ($ty:ident, $name:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Convert to the wire string representation.
            pub fn as_wire_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }

            /// Parse from the wire string representation.
            pub fn from_wire_str(s: &str) -> Result<Self, EnumParseError> {
                match s {
                    $($wire => Ok($ty::$variant),)+
                    _ => Err(EnumParseError {
                        enum_name: $name,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_wire_str())
            }
        }

        impl FromStr for $ty {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_wire_str(s)
            }
        }
    };
}

// ============================================================================
// REQUEST KINDS AND SUBTYPES
// ============================================================================

/// Kind of request an envelope carries to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Client performs a side effect (create a task, clock in, ...)
    #[serde(rename = "action_request")]
    Action,
    /// Client fetches information and reports it back
    #[serde(rename = "info_request")]
    Info,
    /// Client navigates its UI
    #[serde(rename = "ui_action_request")]
    UiAction,
}

wire_enum!(RequestKind, "request kind", {
    Action => "action_request",
    Info => "info_request",
    UiAction => "ui_action_request",
});

impl RequestKind {
    /// Name of the JSON key holding this kind's subtype.
    pub fn subtype_key(&self) -> &'static str {
        match self {
            Self::Action => "action_request_type",
            Self::Info => "info_request_type",
            Self::UiAction => "ui_action_request_type",
        }
    }

    /// Wire strings of every subtype legal for this kind.
    pub fn subtypes(&self) -> Vec<&'static str> {
        match self {
            Self::Action => ActionRequestType::ALL.iter().map(|t| t.as_wire_str()).collect(),
            Self::Info => InfoRequestType::ALL.iter().map(|t| t.as_wire_str()).collect(),
            Self::UiAction => UiActionType::ALL.iter().map(|t| t.as_wire_str()).collect(),
        }
    }
}

/// Actions the client can perform on behalf of the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequestType {
    ToggleClockInOrOut,
    CreateTask,
    UpdateTaskFields,
    DeleteTask,
    AddCommentToTask,
    CreateNote,
    UpdateNote,
    ShareNote,
    DeleteNote,
    ShowNotes,
}

wire_enum!(ActionRequestType, "action request type", {
    ToggleClockInOrOut => "toggle_clock_in_or_out",
    CreateTask => "create_task",
    UpdateTaskFields => "update_task_fields",
    DeleteTask => "delete_task",
    AddCommentToTask => "add_comment_to_task",
    CreateNote => "create_note",
    UpdateNote => "update_note",
    ShareNote => "share_note",
    DeleteNote => "delete_note",
    ShowNotes => "show_notes",
});

/// Information the client is asked to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoRequestType {
    CurrentShift,
    ShiftAssignments,
    ShiftLogs,
    FindTasks,
    FindNotes,
}

wire_enum!(InfoRequestType, "info request type", {
    CurrentShift => "current_shift",
    ShiftAssignments => "shift_assignments",
    ShiftLogs => "shift_logs",
    FindTasks => "find_tasks",
    FindNotes => "find_notes",
});

/// UI navigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiActionType {
    ShiftsPage,
}

wire_enum!(UiActionType, "ui action type", {
    ShiftsPage => "shifts_page",
});

// ============================================================================
// TASK FIELDS
// ============================================================================

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
}

wire_enum!(TaskStatus, "task status", {
    Open => "open",
    InProgress => "inProgress",
    Closed => "closed",
});

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "veryLow")]
    VeryLow,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "veryHigh")]
    VeryHigh,
}

wire_enum!(TaskPriority, "task priority", {
    VeryLow => "veryLow",
    Low => "low",
    Normal => "normal",
    High => "high",
    VeryHigh => "veryHigh",
});

// ============================================================================
// NOTE EDITS
// ============================================================================

/// One step of a note rewrite produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteEditKind {
    /// Text retained from the previous description
    Keep,
    /// Text dropped from the previous description
    Remove,
    /// Text inserted into the new description
    Add,
}

wire_enum!(NoteEditKind, "note edit kind", {
    Keep => "keep",
    Remove => "remove",
    Add => "add",
});
