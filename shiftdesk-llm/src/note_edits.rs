//! Structured note-edit generation.
//!
//! Asks a model for keep/remove/add operations that turn a note's current
//! description into the requested one. Malformed output is fed back to the
//! model for a bounded number of attempts.

use crate::prompt::{note_edit_feedback, note_edit_prompt};
use crate::LanguageModel;
use serde::Deserialize;
use shiftdesk_core::{ConversationMessage, ModelRequest, NoteEditError, NoteEditOperation};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default attempt budget for note edits.
pub const DEFAULT_NOTE_EDIT_ATTEMPTS: u32 = 3;

/// Generates note edit operations with a bounded retry loop.
pub struct NoteEditPlanner {
    model: Arc<dyn LanguageModel>,
    max_retries: u32,
}

impl NoteEditPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            max_retries: DEFAULT_NOTE_EDIT_ATTEMPTS,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Generate the operations rewriting `current_description` as described
    /// by `requested_changes`.
    ///
    /// # Returns
    /// * `Ok(Vec<NoteEditOperation>)` - Non-empty list of operations
    /// * `Err(NoteEditError::Exhausted)` - If every attempt failed
    pub async fn generate(
        &self,
        current_description: &str,
        requested_changes: &str,
    ) -> Result<Vec<NoteEditOperation>, NoteEditError> {
        self.generate_cancellable(current_description, requested_changes, &CancellationToken::new())
            .await
    }

    /// Same as [`generate`](Self::generate), stopping early when `cancel` fires.
    pub async fn generate_cancellable(
        &self,
        current_description: &str,
        requested_changes: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<NoteEditOperation>, NoteEditError> {
        let base_prompt = note_edit_prompt(current_description, requested_changes);
        let mut system = base_prompt.clone();
        let mut last_reason = String::new();

        for attempt in 1..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(NoteEditError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let request = ModelRequest::completion(vec![
                ConversationMessage::system(system.clone()),
                ConversationMessage::human(requested_changes),
            ]);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NoteEditError::Cancelled { attempts: attempt }),
                result = self.model.complete(&request) => result,
            };

            let parsed = match result {
                Ok(response) => parse_operations(&response.content),
                Err(error) => Err(error.to_string()),
            };

            match parsed {
                Ok(operations) => {
                    debug!(attempt, operations = operations.len(), "Note edits generated");
                    return Ok(operations);
                }
                Err(reason) => {
                    warn!(attempt, max_retries = self.max_retries, reason = %reason, "Note edit attempt failed");
                    system = format!("{base_prompt}{}", note_edit_feedback(&reason));
                    last_reason = reason;
                }
            }
        }

        Err(NoteEditError::Exhausted {
            attempts: self.max_retries,
            reason: last_reason,
        })
    }
}

impl std::fmt::Debug for NoteEditPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteEditPlanner")
            .field("model", &self.model.model_id())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OperationsPayload {
    List(Vec<NoteEditOperation>),
    Wrapped { operations: Vec<NoteEditOperation> },
}

/// Parse a JSON array of operations, or an object wrapping it under
/// `operations`. Markdown code fences around the JSON are ignored.
pub fn parse_operations(raw: &str) -> Result<Vec<NoteEditOperation>, String> {
    let body = strip_code_fence(raw.trim());
    let payload: OperationsPayload = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let operations = match payload {
        OperationsPayload::List(ops) | OperationsPayload::Wrapped { operations: ops } => ops,
    };
    if operations.is_empty() {
        return Err("no edit operations returned".to_string());
    }
    Ok(operations)
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptStep, ScriptedModel};
    use shiftdesk_core::{apply_note_edits, LlmError, ModelResponse, NoteEditKind, ShiftdeskError};

    const EDITS: &str = r#"[
        {"type": "keep", "text": "We "},
        {"type": "remove", "text": "were working"},
        {"type": "add", "text": "are working"},
        {"type": "keep", "text": " on the project"}
    ]"#;

    #[test]
    fn test_parse_plain_wrapped_and_fenced() {
        assert_eq!(parse_operations(EDITS).unwrap().len(), 4);

        let wrapped = format!(r#"{{"operations": {EDITS}}}"#);
        assert_eq!(parse_operations(&wrapped).unwrap().len(), 4);

        let fenced = format!("```json\n{EDITS}\n```");
        let ops = parse_operations(&fenced).unwrap();
        assert_eq!(ops[1].kind, NoteEditKind::Remove);
    }

    #[test]
    fn test_parse_rejects_bad_type_and_empty() {
        assert!(parse_operations(r#"[{"type": "replace", "text": "x"}]"#).is_err());
        assert!(parse_operations("[]").is_err());
        assert!(parse_operations("Sure! Here are the edits").is_err());
    }

    #[tokio::test]
    async fn test_recovers_after_malformed_output() {
        let model = Arc::new(ScriptedModel::new([
            ScriptStep::Respond(ModelResponse::text("not json")),
            ScriptStep::Respond(ModelResponse::text(EDITS)),
        ]));
        let planner = NoteEditPlanner::new(model.clone());

        let ops = planner
            .generate("We were working on the project", "present tense")
            .await
            .unwrap();
        assert_eq!(apply_note_edits(&ops), "We are working on the project");

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        let retry_prompt = requests[1].system_prompt().unwrap();
        assert!(retry_prompt.contains("Previous attempt failed with error:"));
        assert!(retry_prompt.ends_with("correct 'type' and 'text' fields."));
        assert!(!requests[0].system_prompt().unwrap().contains("Previous attempt"));
    }

    #[tokio::test]
    async fn test_exhausts_after_budget() {
        let model = Arc::new(ScriptedModel::always_failing(ShiftdeskError::Llm(
            LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: "boom".to_string(),
            },
        )));
        let planner = NoteEditPlanner::new(model.clone()).with_max_retries(2);

        let err = planner.generate("a", "b").await.unwrap_err();
        match err {
            NoteEditError::Exhausted { attempts, reason } => {
                assert_eq!(attempts, 2);
                assert!(reason.contains("boom"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let model = Arc::new(ScriptedModel::new([ScriptStep::Respond(ModelResponse::text(EDITS))]));
        let planner = NoteEditPlanner::new(model.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = planner.generate_cancellable("a", "b", &cancel).await.unwrap_err();
        assert_eq!(err, NoteEditError::Cancelled { attempts: 0 });
        assert_eq!(model.call_count(), 0);
    }
}
