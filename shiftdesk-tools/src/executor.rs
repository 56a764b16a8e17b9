//! Tool execution: invocation in, client envelope out.

use crate::catalog::ToolName;
use crate::notes::{self, NoteSource};
use crate::{shifts, tasks};
use shiftdesk_core::{
    ClientRequest, ConversationMessage, RequestEnvelope, ShiftdeskResult, ToolContext,
    ToolDefinition, ToolError, ToolInvocation,
};
use shiftdesk_llm::NoteEditPlanner;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of executing one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub tool_name: String,
    pub tool_call_id: Option<String>,
    pub envelope: RequestEnvelope,
    /// Wire form of `envelope`, handed to the client as-is
    pub serialized: String,
}

impl ToolOutput {
    /// Tool message answering the invocation, for the conversation history.
    pub fn to_message(&self) -> ConversationMessage {
        ConversationMessage::tool(self.serialized.clone(), self.tool_call_id.clone())
    }
}

/// Turns tool invocations into client request envelopes.
///
/// Tools never perform side effects. `update_note_description` is the only
/// tool that does I/O: it reads the note through a [`NoteSource`] and asks a
/// model for edit operations.
#[derive(Default, Clone)]
pub struct ToolExecutor {
    note_source: Option<Arc<dyn NoteSource>>,
    note_editor: Option<Arc<NoteEditPlanner>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note_source(mut self, source: Arc<dyn NoteSource>) -> Self {
        self.note_source = Some(source);
        self
    }

    pub fn with_note_editor(mut self, planner: Arc<NoteEditPlanner>) -> Self {
        self.note_editor = Some(planner);
        self
    }

    /// Whether `update_note_description` can run.
    pub fn can_edit_notes(&self) -> bool {
        self.note_source.is_some() && self.note_editor.is_some()
    }

    /// Definitions of the tools this executor can run.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL
            .iter()
            .filter(|tool| **tool != ToolName::UpdateNoteDescription || self.can_edit_notes())
            .map(ToolName::definition)
            .collect()
    }

    /// Execute a single invocation.
    ///
    /// # Returns
    /// * `Ok(ToolOutput)` - The envelope and its wire form
    /// * `Err(ToolError::UnknownTool)` - If the name is not in the catalog
    /// * `Err(ToolError::InvalidArguments)` - If the arguments do not parse
    pub async fn execute(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext,
    ) -> ShiftdeskResult<ToolOutput> {
        self.execute_cancellable(invocation, ctx, &CancellationToken::new())
            .await
    }

    /// Same as [`execute`](Self::execute), stopping note edit generation
    /// when `cancel` fires.
    ///
    /// # Returns
    /// * `Err(NoteEditError::Cancelled)` - If `cancel` fired while a note
    ///   edit was being generated
    pub async fn execute_cancellable(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> ShiftdeskResult<ToolOutput> {
        let tool: ToolName = invocation.name.parse()?;
        debug!(tool = %tool, user_id = %ctx.user_id, "Executing tool");

        let request = match self.build_request(tool, invocation, ctx, cancel).await {
            Ok(request) => request,
            Err(e) => {
                warn!(tool = %tool, user_id = %ctx.user_id, error = %e, "Tool execution failed");
                return Err(e);
            }
        };

        let envelope = request.into_envelope()?;
        let serialized = envelope.to_wire_string()?;
        info!(
            tool = %tool,
            user_id = %ctx.user_id,
            kind = %envelope.kind(),
            subtype = envelope.subtype(),
            "Built client request"
        );

        Ok(ToolOutput {
            tool_name: tool.as_str().to_string(),
            tool_call_id: invocation.id.clone(),
            envelope,
            serialized,
        })
    }

    /// Execute invocations in order.
    ///
    /// All or nothing: the first failure is returned and the outputs of
    /// earlier invocations are discarded, so no envelope reaches the client
    /// unless every invocation succeeded. Later invocations are not run.
    pub async fn execute_all(
        &self,
        invocations: &[ToolInvocation],
        ctx: &ToolContext,
    ) -> ShiftdeskResult<Vec<ToolOutput>> {
        self.execute_all_cancellable(invocations, ctx, &CancellationToken::new())
            .await
    }

    /// Same as [`execute_all`](Self::execute_all), stopping when `cancel`
    /// fires.
    pub async fn execute_all_cancellable(
        &self,
        invocations: &[ToolInvocation],
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> ShiftdeskResult<Vec<ToolOutput>> {
        let mut outputs = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            outputs.push(self.execute_cancellable(invocation, ctx, cancel).await?);
        }
        Ok(outputs)
    }

    async fn build_request(
        &self,
        tool: ToolName,
        invocation: &ToolInvocation,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> ShiftdeskResult<ClientRequest> {
        let arguments = &invocation.arguments;
        let request = match tool {
            ToolName::CreateTask
            | ToolName::FindTasks
            | ToolName::UpdateTaskFields
            | ToolName::DeleteTask
            | ToolName::AddCommentToTask => tasks::build(tool, arguments)?,
            ToolName::GetShiftAssignments
            | ToolName::GetShiftLogs
            | ToolName::GetCurrentShiftInfo
            | ToolName::ToggleClockInOrOut
            | ToolName::OpenShiftsPage => shifts::build(tool, arguments, ctx)?,
            ToolName::UpdateNoteDescription => {
                let (Some(source), Some(planner)) = (&self.note_source, &self.note_editor) else {
                    return Err(ToolError::Unavailable {
                        tool: tool.as_str().to_string(),
                        reason: "no note source or note edit model configured".to_string(),
                    }
                    .into());
                };
                notes::build_update(arguments, source.as_ref(), planner, ctx, cancel).await?
            }
            ToolName::CreateNote
            | ToolName::FindNotes
            | ToolName::ShareNote
            | ToolName::DeleteNote
            | ToolName::ShowNotes => notes::build(tool, arguments)?,
        };
        Ok(request)
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("note_source", &self.note_source.is_some())
            .field("note_editor", &self.note_editor.is_some())
            .finish()
    }
}
