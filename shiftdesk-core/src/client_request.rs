//! Typed client requests.
//!
//! Each subtype has its own payload struct with real field types (dates,
//! enums, integers). Tools parse model arguments into these structs and lower
//! them into a [`RequestEnvelope`]; the free-form argument map only exists at
//! the wire boundary.

use crate::dates::{deserialize_date_list, deserialize_opt_date, deserialize_opt_date_list};
use crate::{
    ActionRequestType, ArgValue, EnvelopeError, InfoRequestType, RequestArgs, RequestEnvelope,
    TaskPriority, TaskStatus, UiActionType,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// ============================================================================
// TASK PAYLOADS
// ============================================================================

/// Fields of a task, used by both `create_task` and `update_task_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub task_name: String,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub task_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub task_priority: Option<TaskPriority>,
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
    #[serde(default)]
    pub estimate_duration_minutes: Option<u32>,
    /// `MYSELF` refers to the requesting user; the client resolves it.
    #[serde(default)]
    pub assigned_user_names: Option<Vec<String>>,
    #[serde(default)]
    pub parent_project_name: Option<String>,
}

impl TaskFields {
    /// Task fields with only a name set.
    pub fn named(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            task_description: None,
            task_due_date: None,
            task_priority: None,
            task_status: None,
            estimate_duration_minutes: None,
            assigned_user_names: None,
            parent_project_name: None,
        }
    }
}

/// Reference to a task by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_name: String,
}

/// A comment to attach to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub task_name: String,
    pub comment: String,
}

/// Task search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindTasksArgs {
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_date_list")]
    pub task_due_dates_to_get: Option<Vec<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_opt_date_list")]
    pub task_created_dates_to_get: Option<Vec<NaiveDate>>,
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
    #[serde(default)]
    pub task_priority: Option<TaskPriority>,
    #[serde(default)]
    pub estimate_duration_minutes: Option<u32>,
    #[serde(default)]
    pub parent_project_name: Option<String>,
    #[serde(default)]
    pub author_user_name: Option<String>,
    #[serde(default)]
    pub assigned_user_names: Option<Vec<String>>,
    #[serde(default)]
    pub get_overdue_tasks_only: Option<bool>,
    #[serde(default, skip_serializing)]
    pub show_only: bool,
}

// ============================================================================
// SHIFT PAYLOADS
// ============================================================================

/// Days to fetch shift assignments or logs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDaysArgs {
    #[serde(
        rename(serialize = "days_to_get", deserialize = "daysToGet"),
        alias = "days_to_get",
        default,
        deserialize_with = "deserialize_date_list"
    )]
    pub days_to_get: Vec<NaiveDate>,
    #[serde(default, skip_serializing)]
    pub show_only: bool,
}

/// Current shift lookup. Carries no arguments on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentShiftArgs {
    #[serde(default, skip_serializing)]
    pub show_only: bool,
}

// ============================================================================
// NOTE PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNoteArgs {
    pub note_name: String,
    pub note_description: String,
    #[serde(default = "default_true")]
    pub show_to_user: bool,
}

/// Rewritten note; `updated_note_description` holds the serialized edit
/// operations for the client to render as a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNoteArgs {
    pub note_name: String,
    pub updated_note_description: String,
    #[serde(default = "default_true")]
    pub show_to_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub note_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowNotesArgs {
    #[serde(default)]
    pub note_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindNotesArgs {
    #[serde(default)]
    pub note_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub note_created_date_start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub note_created_date_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub note_updated_date_start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub note_updated_date_end: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub show_to_user: bool,
    #[serde(default, skip_serializing)]
    pub show_only: bool,
}

// ============================================================================
// CLIENT REQUEST
// ============================================================================

/// A fully typed request for the client, one variant per subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    CreateTask(TaskFields),
    UpdateTaskFields(TaskFields),
    DeleteTask(TaskRef),
    AddCommentToTask(TaskComment),
    ToggleClockInOrOut,
    CreateNote(CreateNoteArgs),
    UpdateNote(UpdateNoteArgs),
    ShareNote(NoteRef),
    DeleteNote(NoteRef),
    ShowNotes(ShowNotesArgs),
    CurrentShift(CurrentShiftArgs),
    ShiftAssignments(ShiftDaysArgs),
    ShiftLogs(ShiftDaysArgs),
    FindTasks(FindTasksArgs),
    FindNotes(FindNotesArgs),
    ShiftsPage,
}

impl ClientRequest {
    /// Lower into the wire envelope.
    pub fn into_envelope(self) -> Result<RequestEnvelope, EnvelopeError> {
        use ActionRequestType as A;
        use InfoRequestType as I;

        let envelope = match self {
            Self::CreateTask(p) => RequestEnvelope::action(A::CreateTask, Some(lower(&p)?)),
            Self::UpdateTaskFields(p) => {
                RequestEnvelope::action(A::UpdateTaskFields, Some(lower(&p)?))
            }
            Self::DeleteTask(p) => RequestEnvelope::action(A::DeleteTask, Some(lower(&p)?)),
            Self::AddCommentToTask(p) => {
                RequestEnvelope::action(A::AddCommentToTask, Some(lower(&p)?))
            }
            Self::ToggleClockInOrOut => RequestEnvelope::action(A::ToggleClockInOrOut, None),
            Self::CreateNote(p) => RequestEnvelope::action(A::CreateNote, Some(lower(&p)?)),
            Self::UpdateNote(p) => RequestEnvelope::action(A::UpdateNote, Some(lower(&p)?)),
            Self::ShareNote(p) => RequestEnvelope::action(A::ShareNote, Some(lower(&p)?)),
            Self::DeleteNote(p) => RequestEnvelope::action(A::DeleteNote, Some(lower(&p)?)),
            Self::ShowNotes(p) => RequestEnvelope::action(A::ShowNotes, Some(lower(&p)?)),
            Self::CurrentShift(p) => RequestEnvelope::info(I::CurrentShift, None, p.show_only),
            Self::ShiftAssignments(p) => {
                RequestEnvelope::info(I::ShiftAssignments, Some(lower_shift_days(&p)?), p.show_only)
            }
            Self::ShiftLogs(p) => {
                RequestEnvelope::info(I::ShiftLogs, Some(lower_shift_days(&p)?), p.show_only)
            }
            Self::FindTasks(p) => {
                let mut args = lower(&p)?;
                // Superseded filters the client still reads.
                for legacy in ["task_due_date", "task_created_date", "date_search_radius_days"] {
                    args.insert(legacy.to_string(), None);
                }
                RequestEnvelope::info(I::FindTasks, Some(args), p.show_only)
            }
            Self::FindNotes(p) => RequestEnvelope::info(I::FindNotes, Some(lower(&p)?), p.show_only),
            Self::ShiftsPage => RequestEnvelope::ui_action(UiActionType::ShiftsPage, None),
        };
        Ok(envelope)
    }
}

fn lower_shift_days(payload: &ShiftDaysArgs) -> Result<RequestArgs, EnvelopeError> {
    let mut args = lower(payload)?;
    // Superseded by days_to_get; the client still expects the key.
    args.insert("day_offsets_to_get".to_string(), Some(ArgValue::Integer(0)));
    Ok(args)
}

/// Convert a serializable payload into an argument map.
pub fn lower<T: Serialize>(payload: &T) -> Result<RequestArgs, EnvelopeError> {
    let value = serde_json::to_value(payload).map_err(|e| EnvelopeError::Malformed {
        reason: e.to_string(),
    })?;
    let serde_json::Value::Object(fields) = value else {
        return Err(EnvelopeError::Malformed {
            reason: "payload did not serialize to an object".to_string(),
        });
    };
    Ok(fields
        .into_iter()
        .map(|(key, value)| (key, to_arg_value(value)))
        .collect())
}

fn to_arg_value(value: serde_json::Value) -> Option<ArgValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ArgValue::Flag(b)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => ArgValue::Integer(i),
            None => ArgValue::Text(n.to_string()),
        }),
        Value::String(s) => Some(ArgValue::Text(s)),
        Value::Array(items) => Some(ArgValue::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        other @ Value::Object(_) => Some(ArgValue::Text(other.to_string())),
    }
}
