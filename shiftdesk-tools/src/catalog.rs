//! Tool names, descriptions and parameter schemas.

use crate::{notes, shifts, tasks};
use serde::de::DeserializeOwned;
use shiftdesk_core::{ToolDefinition, ToolError};
use std::fmt;
use std::str::FromStr;

/// Every tool the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateTask,
    FindTasks,
    UpdateTaskFields,
    DeleteTask,
    AddCommentToTask,
    GetShiftAssignments,
    GetShiftLogs,
    GetCurrentShiftInfo,
    ToggleClockInOrOut,
    OpenShiftsPage,
    CreateNote,
    UpdateNoteDescription,
    FindNotes,
    ShareNote,
    DeleteNote,
    ShowNotes,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: &'static [ToolName] = &[
        ToolName::CreateTask,
        ToolName::FindTasks,
        ToolName::UpdateTaskFields,
        ToolName::DeleteTask,
        ToolName::AddCommentToTask,
        ToolName::GetShiftAssignments,
        ToolName::GetShiftLogs,
        ToolName::GetCurrentShiftInfo,
        ToolName::ToggleClockInOrOut,
        ToolName::OpenShiftsPage,
        ToolName::CreateNote,
        ToolName::UpdateNoteDescription,
        ToolName::FindNotes,
        ToolName::ShareNote,
        ToolName::DeleteNote,
        ToolName::ShowNotes,
    ];

    /// Name the model calls the tool by.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateTask => "create_task",
            ToolName::FindTasks => "find_tasks",
            ToolName::UpdateTaskFields => "update_task_fields",
            ToolName::DeleteTask => "delete_task",
            ToolName::AddCommentToTask => "add_comment_to_task",
            ToolName::GetShiftAssignments => "get_shift_assignments",
            ToolName::GetShiftLogs => "get_shift_logs",
            ToolName::GetCurrentShiftInfo => "get_current_shift_info",
            ToolName::ToggleClockInOrOut => "toggle_clock_in_or_out",
            ToolName::OpenShiftsPage => "open_shifts_page",
            ToolName::CreateNote => "create_note",
            ToolName::UpdateNoteDescription => "update_note_description",
            ToolName::FindNotes => "find_notes",
            ToolName::ShareNote => "share_note",
            ToolName::DeleteNote => "delete_note",
            ToolName::ShowNotes => "show_notes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::CreateTask => "Create a task",
            ToolName::FindTasks => "Find tasks",
            ToolName::UpdateTaskFields => "Update fields of a task",
            ToolName::DeleteTask => "Delete a task",
            ToolName::AddCommentToTask => "Add a comment to a task",
            ToolName::GetShiftAssignments => {
                "Get shift assignments (times you need to clock in/out of work) for specific days"
            }
            ToolName::GetShiftLogs => {
                "Get shift logs (times you clocked in/out of work) for specific days"
            }
            ToolName::GetCurrentShiftInfo => "Gets information about the current shift.",
            ToolName::ToggleClockInOrOut => "Clock in if not clocked in or out otherwise",
            ToolName::OpenShiftsPage => "Open the shifts page in the app",
            ToolName::CreateNote => "Create a note",
            ToolName::UpdateNoteDescription => "Update the description of a note",
            ToolName::FindNotes => "Find note(s)",
            ToolName::ShareNote => "Share a note",
            ToolName::DeleteNote => "Delete a note",
            ToolName::ShowNotes => "Show note(s) to the user",
        }
    }

    /// JSON schema of the argument object.
    pub fn parameters(&self) -> serde_json::Value {
        match self {
            ToolName::CreateTask
            | ToolName::FindTasks
            | ToolName::UpdateTaskFields
            | ToolName::DeleteTask
            | ToolName::AddCommentToTask => tasks::parameters(*self),
            ToolName::GetShiftAssignments
            | ToolName::GetShiftLogs
            | ToolName::GetCurrentShiftInfo
            | ToolName::ToggleClockInOrOut
            | ToolName::OpenShiftsPage => shifts::parameters(*self),
            ToolName::CreateNote
            | ToolName::UpdateNoteDescription
            | ToolName::FindNotes
            | ToolName::ShareNote
            | ToolName::DeleteNote
            | ToolName::ShowNotes => notes::parameters(*self),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s.trim())
            .ok_or_else(|| ToolError::UnknownTool {
                name: s.to_string(),
            })
    }
}

/// Definitions of every tool.
pub fn catalog() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

// ============================================================================
// SCHEMA AND ARGUMENT HELPERS
// ============================================================================

pub(crate) fn object_schema(
    properties: serde_json::Value,
    required: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub(crate) fn string_prop(description: &str) -> serde_json::Value {
    serde_json::json!({"type": "string", "description": description})
}

pub(crate) fn string_list_prop(description: &str) -> serde_json::Value {
    serde_json::json!({"type": "array", "items": {"type": "string"}, "description": description})
}

pub(crate) fn enum_prop(values: &[&str], description: &str) -> serde_json::Value {
    serde_json::json!({"type": "string", "enum": values, "description": description})
}

pub(crate) fn bool_prop(description: &str, default: bool) -> serde_json::Value {
    serde_json::json!({"type": "boolean", "description": description, "default": default})
}

pub(crate) fn integer_prop(description: &str) -> serde_json::Value {
    serde_json::json!({"type": "integer", "minimum": 0, "description": description})
}

/// Parse invocation arguments into a typed payload. `null` reads as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: ToolName,
    arguments: &serde_json::Value,
) -> Result<T, ToolError> {
    let value = if arguments.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        arguments.clone()
    };
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments {
        tool: tool.as_str().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), *tool);
        }
        assert!(matches!(
            "summon_pizza".parse::<ToolName>(),
            Err(ToolError::UnknownTool { .. })
        ));
    }

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let definitions = catalog();
        assert_eq!(definitions.len(), 16);
        let names: HashSet<_> = definitions.iter().map(|d| d.name.clone()).collect();
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_every_schema_is_an_object_with_known_required_fields() {
        for definition in catalog() {
            let schema = &definition.parameters;
            assert_eq!(schema["type"], "object", "{}", definition.name);
            let properties = schema["properties"].as_object().unwrap();
            for required in schema["required"].as_array().unwrap() {
                let key = required.as_str().unwrap();
                assert!(properties.contains_key(key), "{}: {}", definition.name, key);
            }
            assert!(!definition.description.is_empty());
        }
    }

    #[test]
    fn test_parse_args_treats_null_as_empty_object() {
        #[derive(serde::Deserialize)]
        struct Empty {
            #[serde(default)]
            show_only: bool,
        }
        let parsed: Empty = parse_args(ToolName::GetCurrentShiftInfo, &serde_json::Value::Null).unwrap();
        assert!(!parsed.show_only);
    }
}
