//! Note tools.
//!
//! Most note tools map arguments straight onto a payload. Updating a note's
//! description is different: the current description is fetched from a
//! [`NoteSource`] and a [`NoteEditPlanner`] turns the requested changes into
//! keep/remove/add operations, which the client renders as a diff.

use crate::catalog::{bool_prop, object_schema, parse_args, string_prop, ToolName};
use crate::tasks::require_non_blank;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shiftdesk_core::{
    ClientRequest, CreateNoteArgs, EnvelopeError, FindNotesArgs, NoteRef, ShiftdeskResult,
    ShowNotesArgs, ToolContext, ToolError, UpdateNoteArgs,
};
use shiftdesk_llm::NoteEditPlanner;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const SHOW_TO_USER_DESCRIPTION: &str = "Whether to open the note for the user afterwards";

pub(crate) fn parameters(tool: ToolName) -> Value {
    match tool {
        ToolName::CreateNote => object_schema(
            json!({
                "note_name": string_prop(""),
                "note_description": string_prop("Full text of the note"),
                "show_to_user": bool_prop(SHOW_TO_USER_DESCRIPTION, true),
            }),
            &["note_name", "note_description"],
        ),
        ToolName::UpdateNoteDescription => object_schema(
            json!({
                "note_id": string_prop("Id of the note to update"),
                "note_name": string_prop(""),
                "note_description_changes": string_prop(
                    "Description of the changes to make to the note, in plain language"
                ),
                "show_to_user": bool_prop(SHOW_TO_USER_DESCRIPTION, true),
            }),
            &["note_id", "note_name", "note_description_changes"],
        ),
        ToolName::FindNotes => object_schema(
            json!({
                "note_name": string_prop(""),
                "note_created_date_start": string_prop("Must be in ISO 8601 format"),
                "note_created_date_end": string_prop("Must be in ISO 8601 format"),
                "note_updated_date_start": string_prop("Must be in ISO 8601 format"),
                "note_updated_date_end": string_prop("Must be in ISO 8601 format"),
                "show_to_user": bool_prop(SHOW_TO_USER_DESCRIPTION, true),
                "show_only": bool_prop("If true, only shows the notes without further actions", false),
            }),
            &[],
        ),
        ToolName::ShareNote | ToolName::DeleteNote => {
            object_schema(json!({"note_name": string_prop("")}), &["note_name"])
        }
        ToolName::ShowNotes => object_schema(
            json!({"note_name": string_prop("Name of the note to show; omit to show all notes")}),
            &[],
        ),
        _ => object_schema(json!({}), &[]),
    }
}

/// Build the client request for a note tool that needs no lookups.
///
/// `update_note_description` goes through [`build_update`] instead.
pub(crate) fn build(tool: ToolName, arguments: &Value) -> Result<ClientRequest, ToolError> {
    let request = match tool {
        ToolName::CreateNote => {
            let args: CreateNoteArgs = parse_args(tool, arguments)?;
            require_non_blank(tool, "note_name", &args.note_name)?;
            ClientRequest::CreateNote(args)
        }
        ToolName::FindNotes => ClientRequest::FindNotes(parse_args::<FindNotesArgs>(tool, arguments)?),
        ToolName::ShareNote => ClientRequest::ShareNote(note_ref(tool, arguments)?),
        ToolName::DeleteNote => ClientRequest::DeleteNote(note_ref(tool, arguments)?),
        ToolName::ShowNotes => ClientRequest::ShowNotes(parse_args::<ShowNotesArgs>(tool, arguments)?),
        other => {
            return Err(ToolError::UnknownTool {
                name: other.as_str().to_string(),
            })
        }
    };
    Ok(request)
}

fn note_ref(tool: ToolName, arguments: &Value) -> Result<NoteRef, ToolError> {
    let note: NoteRef = parse_args(tool, arguments)?;
    require_non_blank(tool, "note_name", &note.note_name)?;
    Ok(note)
}

/// Arguments of `update_note_description` as the model sends them.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteRequest {
    pub note_id: String,
    pub note_name: String,
    pub note_description_changes: String,
    #[serde(default = "default_show_to_user")]
    pub show_to_user: bool,
}

fn default_show_to_user() -> bool {
    true
}

/// Resolve an `update_note_description` call into an update request.
///
/// # Arguments
/// * `arguments` - Raw invocation arguments
/// * `source` - Where the current description is read from
/// * `planner` - Generates the edit operations
/// * `ctx` - Context of the requesting user
/// * `cancel` - Stops edit generation between or during attempts
pub(crate) async fn build_update(
    arguments: &Value,
    source: &dyn NoteSource,
    planner: &NoteEditPlanner,
    ctx: &ToolContext,
    cancel: &CancellationToken,
) -> ShiftdeskResult<ClientRequest> {
    let tool = ToolName::UpdateNoteDescription;
    let request: UpdateNoteRequest = parse_args(tool, arguments)?;
    require_non_blank(tool, "note_id", &request.note_id)?;
    require_non_blank(tool, "note_description_changes", &request.note_description_changes)?;

    let current = source.note_description(&request.note_id, ctx).await?;
    let operations = planner
        .generate_cancellable(&current, &request.note_description_changes, cancel)
        .await?;
    debug!(
        note_id = %request.note_id,
        operations = operations.len(),
        "Generated note edit operations"
    );

    let updated_note_description =
        serde_json::to_string(&operations).map_err(|e| EnvelopeError::Malformed {
            reason: e.to_string(),
        })?;

    Ok(ClientRequest::UpdateNote(UpdateNoteArgs {
        note_name: request.note_name,
        updated_note_description,
        show_to_user: request.show_to_user,
    }))
}

// ============================================================================
// NOTE SOURCE
// ============================================================================

/// Read access to stored notes.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Current description of a note in the user's organization.
    ///
    /// # Returns
    /// * `Ok(String)` - The description, possibly empty
    /// * `Err(ToolError::NoteNotFound)` - If no such note exists
    async fn note_description(&self, note_id: &str, ctx: &ToolContext) -> ShiftdeskResult<String>;
}

/// Note store keyed by organization and note id.
#[derive(Debug, Default)]
pub struct InMemoryNoteSource {
    notes: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryNoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a note's description.
    pub fn insert(
        &self,
        org_id: impl Into<String>,
        note_id: impl Into<String>,
        description: impl Into<String>,
    ) {
        let mut notes = match self.notes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        notes.insert((org_id.into(), note_id.into()), description.into());
    }

    pub fn len(&self) -> usize {
        match self.notes.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NoteSource for InMemoryNoteSource {
    async fn note_description(&self, note_id: &str, ctx: &ToolContext) -> ShiftdeskResult<String> {
        let notes = match self.notes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        notes
            .get(&(ctx.org_id.clone(), note_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                ToolError::NoteNotFound {
                    note_id: note_id.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftdesk_core::{ModelResponse, NoteEditError, NoteEditKind, NoteEditOperation, ShiftdeskError};
    use shiftdesk_llm::{ScriptStep, ScriptedModel};
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext::new("u-1", "org-1")
    }

    #[test]
    fn test_create_note_defaults_show_to_user() {
        let request = build(
            ToolName::CreateNote,
            &json!({"note_name": "Groceries", "note_description": "milk"}),
        )
        .unwrap();
        assert_eq!(
            request,
            ClientRequest::CreateNote(CreateNoteArgs {
                note_name: "Groceries".to_string(),
                note_description: "milk".to_string(),
                show_to_user: true,
            })
        );
    }

    #[test]
    fn test_show_notes_without_name() {
        assert_eq!(
            build(ToolName::ShowNotes, &Value::Null).unwrap(),
            ClientRequest::ShowNotes(ShowNotesArgs::default())
        );
    }

    #[test]
    fn test_share_note_requires_name() {
        assert!(build(ToolName::ShareNote, &json!({})).is_err());
        assert!(build(ToolName::DeleteNote, &json!({"note_name": ""})).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_source_is_scoped_by_org() {
        let source = InMemoryNoteSource::new();
        source.insert("org-1", "n-1", "milk\neggs");
        assert_eq!(source.len(), 1);

        let found = source.note_description("n-1", &ctx()).await.unwrap();
        assert_eq!(found, "milk\neggs");

        let other_org = ToolContext::new("u-2", "org-2");
        let err = source.note_description("n-1", &other_org).await.unwrap_err();
        assert!(matches!(err, ShiftdeskError::Tool(ToolError::NoteNotFound { .. })));
    }

    #[tokio::test]
    async fn test_build_update_serializes_operations() {
        let source = InMemoryNoteSource::new();
        source.insert("org-1", "n-1", "milk\neggs");
        let model = Arc::new(ScriptedModel::new(vec![ScriptStep::Respond(ModelResponse::text(
            r#"[{"type":"keep","text":"milk\n"},{"type":"remove","text":"eggs"},{"type":"add","text":"bread"}]"#,
        ))]));
        let planner = NoteEditPlanner::new(model);

        let request = build_update(
            &json!({"note_id": "n-1", "note_name": "Groceries", "note_description_changes": "swap eggs for bread"}),
            &source,
            &planner,
            &ctx(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let ClientRequest::UpdateNote(args) = request else {
            panic!("expected update_note");
        };
        let operations: Vec<NoteEditOperation> =
            serde_json::from_str(&args.updated_note_description).unwrap();
        assert_eq!(operations.len(), 3);
        assert_eq!(operations[1].kind, NoteEditKind::Remove);
        assert!(args.show_to_user);
    }

    #[tokio::test]
    async fn test_build_update_surfaces_exhaustion() {
        let source = InMemoryNoteSource::new();
        source.insert("org-1", "n-1", "milk");
        let model = Arc::new(ScriptedModel::new(vec![ScriptStep::Respond(ModelResponse::text(
            "not json",
        ))]));
        let planner = NoteEditPlanner::new(model).with_max_retries(2);

        let err = build_update(
            &json!({"note_id": "n-1", "note_name": "Groceries", "note_description_changes": "x"}),
            &source,
            &planner,
            &ctx(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ShiftdeskError::NoteEdit(NoteEditError::Exhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_build_update_missing_note() {
        let source = InMemoryNoteSource::new();
        let model = Arc::new(ScriptedModel::new(vec![]));
        let planner = NoteEditPlanner::new(model);
        let err = build_update(
            &json!({"note_id": "nope", "note_name": "x", "note_description_changes": "y"}),
            &source,
            &planner,
            &ctx(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ShiftdeskError::Tool(ToolError::NoteNotFound { .. })));
    }

    #[tokio::test]
    async fn test_build_update_stops_when_cancelled_mid_generation() {
        let source = InMemoryNoteSource::new();
        source.insert("org-1", "n-1", "milk");
        let model = Arc::new(ScriptedModel::new(vec![ScriptStep::Stall]));
        let planner = NoteEditPlanner::new(model.clone());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = build_update(
            &json!({"note_id": "n-1", "note_name": "Groceries", "note_description_changes": "x"}),
            &source,
            &planner,
            &ctx(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ShiftdeskError::NoteEdit(NoteEditError::Cancelled { attempts: 1 })
        ));
        assert_eq!(model.call_count(), 1);
    }
}
