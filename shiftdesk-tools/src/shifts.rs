//! Shift tools: assignments, logs, current shift, clocking and the shifts page.

use crate::catalog::{bool_prop, object_schema, parse_args, string_list_prop, ToolName};
use serde_json::{json, Value};
use shiftdesk_core::{ClientRequest, CurrentShiftArgs, ShiftDaysArgs, ToolContext, ToolError};

const SHOW_ONLY_DESCRIPTION: &str = "If True, only shows the shift info without further actions";

pub(crate) fn parameters(tool: ToolName) -> Value {
    match tool {
        ToolName::GetShiftAssignments | ToolName::GetShiftLogs => object_schema(
            json!({
                "daysToGet": string_list_prop("Days to get, each in ISO 8601 format"),
                "show_only": bool_prop(SHOW_ONLY_DESCRIPTION, false),
            }),
            &["daysToGet"],
        ),
        ToolName::GetCurrentShiftInfo => object_schema(
            json!({"show_only": bool_prop(SHOW_ONLY_DESCRIPTION, false)}),
            &[],
        ),
        _ => object_schema(json!({}), &[]),
    }
}

/// Build the client request for a shift tool.
///
/// An empty or missing `daysToGet` means today in the user's timezone.
pub(crate) fn build(
    tool: ToolName,
    arguments: &Value,
    ctx: &ToolContext,
) -> Result<ClientRequest, ToolError> {
    let request = match tool {
        ToolName::GetShiftAssignments => ClientRequest::ShiftAssignments(days(tool, arguments, ctx)?),
        ToolName::GetShiftLogs => ClientRequest::ShiftLogs(days(tool, arguments, ctx)?),
        ToolName::GetCurrentShiftInfo => {
            ClientRequest::CurrentShift(parse_args::<CurrentShiftArgs>(tool, arguments)?)
        }
        ToolName::ToggleClockInOrOut => ClientRequest::ToggleClockInOrOut,
        ToolName::OpenShiftsPage => ClientRequest::ShiftsPage,
        other => {
            return Err(ToolError::UnknownTool {
                name: other.as_str().to_string(),
            })
        }
    };
    Ok(request)
}

fn days(tool: ToolName, arguments: &Value, ctx: &ToolContext) -> Result<ShiftDaysArgs, ToolError> {
    let mut args: ShiftDaysArgs = parse_args(tool, arguments)?;
    if args.days_to_get.is_empty() {
        args.days_to_get.push(ctx.today());
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ctx() -> ToolContext {
        ToolContext::new("u-1", "org-1")
            .with_timezone_offset(-300)
            .at(Utc.with_ymd_and_hms(2025, 3, 15, 2, 30, 0).unwrap())
    }

    #[test]
    fn test_missing_days_default_to_local_today() {
        let request = build(ToolName::GetShiftLogs, &json!({}), &ctx()).unwrap();
        let ClientRequest::ShiftLogs(args) = request else {
            panic!("expected shift logs");
        };
        // 02:30 UTC is still the 14th at UTC-5.
        assert_eq!(args.days_to_get, vec![NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()]);
        assert!(!args.show_only);
    }

    #[test]
    fn test_days_are_normalized() {
        let request = build(
            ToolName::GetShiftAssignments,
            &json!({"daysToGet": ["2025-03-16T09:00:00Z", "2025/03/17"], "show_only": true}),
            &ctx(),
        )
        .unwrap();
        let ClientRequest::ShiftAssignments(args) = request else {
            panic!("expected shift assignments");
        };
        assert_eq!(
            args.days_to_get,
            vec![
                NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            ]
        );
        assert!(args.show_only);
    }

    #[test]
    fn test_unparseable_day_is_rejected() {
        let err = build(ToolName::GetShiftLogs, &json!({"daysToGet": ["someday"]}), &ctx()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "get_shift_logs"));
    }

    #[test]
    fn test_argument_free_tools() {
        assert_eq!(
            build(ToolName::ToggleClockInOrOut, &Value::Null, &ctx()).unwrap(),
            ClientRequest::ToggleClockInOrOut
        );
        assert_eq!(
            build(ToolName::OpenShiftsPage, &json!({}), &ctx()).unwrap(),
            ClientRequest::ShiftsPage
        );
        assert_eq!(
            build(ToolName::GetCurrentShiftInfo, &json!({"show_only": true}), &ctx()).unwrap(),
            ClientRequest::CurrentShift(CurrentShiftArgs { show_only: true })
        );
    }
}
