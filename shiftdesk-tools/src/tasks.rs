//! Task tools: create, find, update, delete and comment on tasks.

use crate::catalog::{
    bool_prop, enum_prop, integer_prop, object_schema, parse_args, string_list_prop, string_prop,
    ToolName,
};
use serde_json::{json, Value};
use shiftdesk_core::{
    ClientRequest, FindTasksArgs, TaskComment, TaskFields, TaskPriority, TaskRef, TaskStatus,
    ToolError,
};

fn priorities() -> Vec<&'static str> {
    TaskPriority::ALL.iter().map(|p| p.as_wire_str()).collect()
}

fn statuses() -> Vec<&'static str> {
    TaskStatus::ALL.iter().map(|s| s.as_wire_str()).collect()
}

fn task_field_properties() -> Value {
    json!({
        "task_name": string_prop(""),
        "task_description": string_prop(""),
        "task_due_date": string_prop("Must be in ISO 8601 format"),
        "task_priority": enum_prop(&priorities(), "Must be: veryLow, low, normal, high, veryHigh"),
        "task_status": enum_prop(&statuses(), "Must be: open, inProgress, or closed"),
        "estimate_duration_minutes": integer_prop(""),
        "assigned_user_names": string_list_prop("Use MYSELF for the requesting user"),
        "parent_project_name": string_prop(""),
    })
}

pub(crate) fn parameters(tool: ToolName) -> Value {
    match tool {
        ToolName::CreateTask | ToolName::UpdateTaskFields => {
            object_schema(task_field_properties(), &["task_name"])
        }
        ToolName::FindTasks => object_schema(
            json!({
                "task_name": string_prop(""),
                "task_description": string_prop(""),
                "task_due_dates_to_get": string_list_prop("Due dates of tasks to get, ISO 8601"),
                "task_created_dates_to_get": string_list_prop("Created dates of tasks to get, ISO 8601"),
                "task_status": enum_prop(&statuses(), "Must be: open, inProgress, or closed"),
                "task_priority": enum_prop(&priorities(), "Must be: veryLow, low, normal, high, veryHigh"),
                "estimate_duration_minutes": integer_prop(""),
                "parent_project_name": string_prop(""),
                "author_user_name": string_prop(""),
                "assigned_user_names": string_list_prop("Use MYSELF for the requesting user"),
                "get_overdue_tasks_only": bool_prop("", false),
                "show_only": bool_prop("If true, only shows the tasks without further actions", false),
            }),
            &[],
        ),
        ToolName::DeleteTask => object_schema(json!({"task_name": string_prop("")}), &["task_name"]),
        ToolName::AddCommentToTask => object_schema(
            json!({
                "task_name": string_prop(""),
                "comment": string_prop("Text of the comment"),
            }),
            &["task_name", "comment"],
        ),
        _ => object_schema(json!({}), &[]),
    }
}

/// Build the client request for a task tool.
pub(crate) fn build(tool: ToolName, arguments: &Value) -> Result<ClientRequest, ToolError> {
    let request = match tool {
        ToolName::CreateTask => ClientRequest::CreateTask(named_fields(tool, arguments)?),
        ToolName::UpdateTaskFields => ClientRequest::UpdateTaskFields(named_fields(tool, arguments)?),
        ToolName::FindTasks => ClientRequest::FindTasks(parse_args::<FindTasksArgs>(tool, arguments)?),
        ToolName::DeleteTask => {
            let task: TaskRef = parse_args(tool, arguments)?;
            require_non_blank(tool, "task_name", &task.task_name)?;
            ClientRequest::DeleteTask(task)
        }
        ToolName::AddCommentToTask => {
            let comment: TaskComment = parse_args(tool, arguments)?;
            require_non_blank(tool, "task_name", &comment.task_name)?;
            require_non_blank(tool, "comment", &comment.comment)?;
            ClientRequest::AddCommentToTask(comment)
        }
        other => {
            return Err(ToolError::UnknownTool {
                name: other.as_str().to_string(),
            })
        }
    };
    Ok(request)
}

fn named_fields(tool: ToolName, arguments: &Value) -> Result<TaskFields, ToolError> {
    let fields: TaskFields = parse_args(tool, arguments)?;
    require_non_blank(tool, "task_name", &fields.task_name)?;
    Ok(fields)
}

pub(crate) fn require_non_blank(tool: ToolName, field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArguments {
            tool: tool.as_str().to_string(),
            reason: format!("{field} must not be blank"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_create_task_parses_typed_fields() {
        let request = build(
            ToolName::CreateTask,
            &json!({
                "task_name": "Review PR",
                "task_due_date": "2025/03/14",
                "task_priority": "veryHigh",
                "task_status": "inProgress",
                "estimate_duration_minutes": 30,
                "assigned_user_names": ["MYSELF"]
            }),
        )
        .unwrap();

        let ClientRequest::CreateTask(fields) = request else {
            panic!("expected create_task");
        };
        assert_eq!(fields.task_due_date, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(fields.task_priority, Some(TaskPriority::VeryHigh));
        assert_eq!(fields.task_status, Some(TaskStatus::InProgress));
        assert_eq!(fields.estimate_duration_minutes, Some(30));
    }

    #[test]
    fn test_create_task_rejects_bad_enum_and_blank_name() {
        let err = build(ToolName::CreateTask, &json!({"task_name": "x", "task_priority": "urgent"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "create_task"));

        let err = build(ToolName::CreateTask, &json!({"task_name": "  "})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref reason, .. } if reason.contains("task_name")));

        assert!(build(ToolName::CreateTask, &json!({})).is_err());
    }

    #[test]
    fn test_find_tasks_accepts_empty_arguments() {
        let request = build(ToolName::FindTasks, &Value::Null).unwrap();
        assert_eq!(request, ClientRequest::FindTasks(FindTasksArgs::default()));
    }

    #[test]
    fn test_find_tasks_show_only_flag() {
        let request = build(ToolName::FindTasks, &json!({"task_status": "open", "show_only": true})).unwrap();
        let ClientRequest::FindTasks(args) = request else {
            panic!("expected find_tasks");
        };
        assert!(args.show_only);
        assert_eq!(args.task_status, Some(TaskStatus::Open));
    }

    #[test]
    fn test_add_comment_requires_comment() {
        assert!(build(ToolName::AddCommentToTask, &json!({"task_name": "Review PR"})).is_err());
        let request = build(
            ToolName::AddCommentToTask,
            &json!({"task_name": "Review PR", "comment": "LGTM"}),
        )
        .unwrap();
        assert_eq!(
            request,
            ClientRequest::AddCommentToTask(TaskComment {
                task_name: "Review PR".to_string(),
                comment: "LGTM".to_string(),
            })
        );
    }

    #[test]
    fn test_schema_lists_enum_values() {
        let schema = parameters(ToolName::CreateTask);
        assert_eq!(
            schema["properties"]["task_priority"]["enum"],
            json!(["veryLow", "low", "normal", "high", "veryHigh"])
        );
        assert_eq!(schema["required"], json!(["task_name"]));
    }
}
