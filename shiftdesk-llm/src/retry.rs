//! Bounded tool-call retry protocol.
//!
//! Each attempt asks the model for a structured tool call. A response without
//! a usable call, or a failing model call, is fed back into the next prompt
//! until `max_retries` attempts have been spent. Attempts run strictly one
//! after another; the model call is the only suspension point.

use crate::prompt::ToolCallPrompt;
use crate::{LanguageModel, UsageTracker};
use serde::Serialize;
use shiftdesk_core::{
    ConversationMessage, InvocationError, ModelRequest, ModelResponse, RetryConfig, ToolContext,
    ToolDefinition, ToolInvocation,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message shown to end users when tool calling gives up.
pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, I could not complete the requested action.";

// ============================================================================
// INPUT
// ============================================================================

/// Everything one retry-protocol run needs from its caller.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallRequest<'a> {
    /// What the tool call should accomplish
    pub instruction: &'a str,
    /// Optional plan produced upstream
    pub plan: Option<&'a str>,
    /// Caller-owned history; never modified
    pub conversation: &'a [ConversationMessage],
    pub context: &'a ToolContext,
}

impl<'a> ToolCallRequest<'a> {
    pub fn new(
        instruction: &'a str,
        conversation: &'a [ConversationMessage],
        context: &'a ToolContext,
    ) -> Self {
        Self {
            instruction,
            plan: None,
            conversation,
            context,
        }
    }

    pub fn with_plan(mut self, plan: &'a str) -> Self {
        self.plan = Some(plan);
        self
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Where a protocol run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Attempting(u32),
    Succeeded,
    Exhausted,
    Cancelled,
}

/// Per-run bookkeeping. Created fresh for every call and dropped on return.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub phase: RetryPhase,
    /// Attempts started so far
    pub attempt: u32,
    pub max_retries: u32,
    /// Failure of the latest attempt, absent before the first failure
    pub last_error: Option<InvocationError>,
    consecutive_transport_failures: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            phase: RetryPhase::Attempting(1),
            attempt: 0,
            max_retries,
            last_error: None,
            consecutive_transport_failures: 0,
        }
    }

    /// Start the next attempt. Returns `false` when the budget is spent.
    pub fn begin_attempt(&mut self) -> bool {
        if self.attempt >= self.max_retries {
            self.phase = RetryPhase::Exhausted;
            return false;
        }
        self.attempt += 1;
        self.phase = RetryPhase::Attempting(self.attempt);
        true
    }

    /// Record a failed attempt.
    pub fn fail(&mut self, error: InvocationError) {
        if error.is_transport() {
            self.consecutive_transport_failures += 1;
        } else {
            self.consecutive_transport_failures = 0;
        }
        self.last_error = Some(error);
    }

    pub fn succeed(&mut self) {
        self.phase = RetryPhase::Succeeded;
    }

    pub fn cancel(&mut self) {
        self.phase = RetryPhase::Cancelled;
    }

    /// Consecutive transport failures right before the current attempt.
    pub fn consecutive_transport_failures(&self) -> u32 {
        self.consecutive_transport_failures
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.phase, RetryPhase::Attempting(_))
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Report produced when every attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExhaustionReport {
    pub attempts: u32,
    #[serde(serialize_with = "serialize_invocation_error")]
    pub last_error: InvocationError,
    /// Stage the caller should route to next
    pub routing_hint: String,
}

impl ExhaustionReport {
    /// Taxonomy tag of the last error.
    pub fn error_tag(&self) -> &'static str {
        self.last_error.tag()
    }

    /// Text safe to show to end users.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Serializes an invocation error as `{kind, message}`.
fn serialize_invocation_error<S: serde::Serializer>(
    error: &InvocationError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("kind", error.tag())?;
    map.serialize_entry("message", &error.to_string())?;
    map.end()
}

/// Result of one protocol run.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    Succeeded {
        /// Every invocation carries an id and a non-blank name
        invocations: Vec<ToolInvocation>,
        response: ModelResponse,
        /// 1-based attempt that produced the invocations
        attempts: u32,
    },
    Exhausted(ExhaustionReport),
    Cancelled {
        /// Attempts started before cancellation was observed
        attempts: u32,
    },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Cancelled { attempts } => *attempts,
            Self::Exhausted(report) => report.attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

// ============================================================================
// TOOL CALLER
// ============================================================================

/// Obtains a validated structured tool call from a language model.
pub struct ToolCaller {
    model: Arc<dyn LanguageModel>,
    tools: Vec<ToolDefinition>,
    config: RetryConfig,
    usage: Option<Arc<UsageTracker>>,
}

impl ToolCaller {
    /// # Arguments
    /// * `model` - Model answering every attempt
    /// * `tools` - Tools advertised to the model
    /// * `config` - Attempt budget, window, timeout and backoff. A budget
    ///   of zero is raised to one attempt.
    pub fn new(model: Arc<dyn LanguageModel>, tools: Vec<ToolDefinition>, mut config: RetryConfig) -> Self {
        config.max_retries = config.max_retries.max(1);
        Self {
            model,
            tools,
            config,
            usage: None,
        }
    }

    /// Record token usage of every attempt in `tracker`.
    pub fn with_usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.usage = Some(tracker);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Run the protocol.
    ///
    /// `cancel` is checked before each attempt and raced against the model
    /// call and any backoff sleep.
    ///
    /// # Returns
    /// * `Succeeded` - With the invocations and the attempt that produced them
    /// * `Exhausted` - After `max_retries` failed attempts
    /// * `Cancelled` - When `cancel` fired first
    pub async fn call(&self, request: &ToolCallRequest<'_>, cancel: &CancellationToken) -> RetryOutcome {
        let mut state = RetryState::new(self.config.max_retries);
        let history: Vec<ConversationMessage> = self
            .config
            .context_window
            .apply(request.conversation)
            .into_iter()
            .cloned()
            .collect();

        while state.begin_attempt() {
            let attempt = state.attempt;

            if cancel.is_cancelled() {
                return self.cancelled(&mut state, attempt - 1);
            }

            if let Some(backoff) = &self.config.transport_backoff {
                let failures = state.consecutive_transport_failures();
                if failures > 0 {
                    let delay = backoff.delay_for(failures);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off after transport failure");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return self.cancelled(&mut state, attempt - 1),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }

            let system = ToolCallPrompt {
                instruction: request.instruction,
                plan: request.plan,
                context: request.context,
                attempt,
                previous_error: state.last_error.as_ref(),
            }
            .render();

            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.push(ConversationMessage::system(system));
            messages.extend(history.iter().cloned());
            let model_request = ModelRequest::tool_call(messages, self.tools.clone());

            debug!(
                attempt,
                max_retries = state.max_retries,
                model = self.model.model_id(),
                user_id = %request.context.user_id,
                "Requesting tool call"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(&mut state, attempt),
                result = self.invoke(&model_request) => result,
            };

            match result.and_then(validate) {
                Ok((invocations, response)) => {
                    state.succeed();
                    info!(
                        attempt,
                        max_retries = state.max_retries,
                        tools = ?invocations.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
                        "Tool call obtained"
                    );
                    return RetryOutcome::Succeeded {
                        invocations,
                        response,
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_retries = state.max_retries,
                        error_kind = error.tag(),
                        error = %error,
                        "Tool call attempt failed"
                    );
                    state.fail(error);
                }
            }
        }

        let last_error = state
            .last_error
            .clone()
            .unwrap_or(InvocationError::NoInvocationProduced);
        warn!(
            attempts = state.attempt,
            error_kind = last_error.tag(),
            routing_hint = %self.config.fallback_stage,
            "Tool calling exhausted"
        );
        RetryOutcome::Exhausted(ExhaustionReport {
            attempts: state.attempt,
            last_error,
            routing_hint: self.config.fallback_stage.clone(),
        })
    }

    fn cancelled(&self, state: &mut RetryState, attempts: u32) -> RetryOutcome {
        state.cancel();
        info!(attempts, "Tool calling cancelled");
        RetryOutcome::Cancelled { attempts }
    }

    /// One model call, bounded by the attempt timeout. Any failure becomes a
    /// transport exception.
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, InvocationError> {
        let call = self.model.complete(request);
        let result = match self.config.attempt_timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    self.record_failure();
                    return Err(InvocationError::TransportException {
                        message: format!("model call timed out after {}ms", limit.as_millis()),
                    });
                }
            },
            None => call.await,
        };

        match result {
            Ok(response) => {
                if let Some(tracker) = &self.usage {
                    tracker.record_call(response.usage.as_ref());
                }
                Ok(response)
            }
            Err(error) => {
                self.record_failure();
                Err(InvocationError::TransportException {
                    message: error.to_string(),
                })
            }
        }
    }

    fn record_failure(&self) {
        if let Some(tracker) = &self.usage {
            tracker.record_failure();
        }
    }
}

impl std::fmt::Debug for ToolCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCaller")
            .field("model", &self.model.model_id())
            .field("tools", &self.tools.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Check that a response carries at least one complete invocation, and give
/// every invocation an id.
pub fn validate(response: ModelResponse) -> Result<(Vec<ToolInvocation>, ModelResponse), InvocationError> {
    let calls = match &response.tool_calls {
        None => return Err(InvocationError::NoInvocationProduced),
        Some(calls) if calls.is_empty() => return Err(InvocationError::EmptyInvocationList),
        Some(calls) => calls,
    };

    for (index, call) in calls.iter().enumerate() {
        if call.name.trim().is_empty() {
            return Err(InvocationError::IncompleteInvocation {
                reason: format!("call {index} has a blank name"),
            });
        }
        if !(call.arguments.is_object() || call.arguments.is_null()) {
            return Err(InvocationError::IncompleteInvocation {
                reason: format!("arguments of '{}' are not an object", call.name),
            });
        }
    }

    let invocations = calls
        .iter()
        .cloned()
        .map(|mut call| {
            if call.id.as_deref().map_or(true, str::is_empty) {
                call.id = Some(format!("call_{}", Uuid::now_v7().simple()));
            }
            if call.arguments.is_null() {
                call.arguments = serde_json::Value::Object(Default::default());
            }
            call
        })
        .collect();
    Ok((invocations, response))
}

// ============================================================================
// UNIT TESTS
// ============================================================================
