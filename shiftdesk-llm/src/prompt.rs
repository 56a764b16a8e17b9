//! Prompt rendering for the tool caller and the note-edit planner.

use shiftdesk_core::{InvocationError, ToolContext};

/// Restated on every retry after the failure description.
pub const TOOL_CALL_REQUIREMENT: &str =
    "You must call a tool in the tool_calls output and not respond via content. \
     Return a non-empty list of structured tool calls, each with a tool name and its arguments.";

/// Appended to the note-edit prompt after a failed parse.
pub const NOTE_EDIT_FORMAT_REMINDER: &str =
    "Please ensure you're returning a valid JSON array of operations with correct 'type' and 'text' fields.";

/// Inputs of one tool-caller system prompt.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallPrompt<'a> {
    pub instruction: &'a str,
    pub plan: Option<&'a str>,
    pub context: &'a ToolContext,
    /// 1-based attempt number
    pub attempt: u32,
    /// Failure of the immediately preceding attempt
    pub previous_error: Option<&'a InvocationError>,
}

impl ToolCallPrompt<'_> {
    /// Render the system message content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("You MUST respond with a proper tool call.\n\n");

        if self.attempt > 1 {
            if let Some(error) = self.previous_error {
                out.push_str(&retry_guidance(error));
                out.push_str("\n\n");
            }
        }

        out.push_str(&format!("Call a tool based on:\n{}\n\n", self.instruction.trim()));
        if let Some(plan) = self.plan.filter(|p| !p.trim().is_empty()) {
            out.push_str(&format!("PLAN CONTEXT:\n{}\n\n", plan.trim()));
        }

        out.push_str(
            "INSTRUCTIONS:\n\
             - Analyze the context and determine the appropriate parameters for this tool\n\
             - Use ONLY structured tool calls\n\
             - Include ONLY the tool call without additional explanation\n\n",
        );

        match self.context.language.as_deref() {
            Some(language) => {
                out.push_str(&format!("Respond in the user's language ({language}).\n\n"));
            }
            None => out.push_str("Prefer using the same language as the user's query.\n\n"),
        }

        out.push_str("All dates should be in ISO 8601 format.\n\n");
        out.push_str(
            "If user refers to self, use keyword MYSELF in the assigned_user_names call.\n\n",
        );
        out.push_str(&format!(
            "The current date and time is: {}\n\n",
            self.context.current_datetime_display()
        ));
        out.push_str(&format!(
            "Current UI Context: {}",
            self.context.ui_context.as_deref().unwrap_or("")
        ));
        out
    }
}

/// Feedback naming the previous failure and restating the requirement.
pub fn retry_guidance(error: &InvocationError) -> String {
    format!("ERROR: Previous attempt failed: {error}. {TOOL_CALL_REQUIREMENT}")
}

/// System prompt asking for keep/remove/add operations that rewrite a note.
pub fn note_edit_prompt(current_description: &str, requested_changes: &str) -> String {
    format!(
        r#"You are an expert at generating structured note modifications.

Given a previous note description and requested changes, generate a JSON array of edit operations.
Each operation should contain:
- "type": either "keep", "remove", or "add"
- "text": the text content for this operation

The combined sequence of operations should form the complete updated note.

Example input:
Previous note: "We were working on the project yesterday"
Changes: "Change 'were working' to 'are working' and add 'and made good progress' at the end"

Example output:
[
    {{"type": "keep", "text": "We "}},
    {{"type": "remove", "text": "were working"}},
    {{"type": "add", "text": "are working"}},
    {{"type": "keep", "text": " on the project yesterday"}},
    {{"type": "add", "text": " and made good progress"}}
]

Previous note description: {current_description}
Changes to the note description: {requested_changes}

Respond only with the JSON array of operations."#
    )
}

/// Feedback appended to the note-edit prompt after a failed attempt.
pub fn note_edit_feedback(reason: &str) -> String {
    format!("\nPrevious attempt failed with error: {reason}. {NOTE_EDIT_FORMAT_REMINDER}")
}
