//! SHIFTDESK LLM - Language Model Layer
//!
//! Provider-agnostic model trait, the bounded tool-call retry protocol and the
//! note-edit generation loop. Concrete HTTP adapters live in [`providers`].

pub mod note_edits;
pub mod prompt;
pub mod providers;
pub mod retry;

pub use note_edits::NoteEditPlanner;
pub use retry::{ExhaustionReport, RetryOutcome, RetryPhase, RetryState, ToolCallRequest, ToolCaller};

use async_trait::async_trait;
use shiftdesk_core::{
    LlmError, ModelRequest, ModelResponse, ShiftdeskError, ShiftdeskResult, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// LANGUAGE MODEL TRAIT
// ============================================================================

/// A chat model that can answer with text or structured tool calls.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct MyModel { /* ... */ }
///
/// #[async_trait]
/// impl LanguageModel for MyModel {
///     async fn complete(&self, request: &ModelRequest) -> ShiftdeskResult<ModelResponse> {
///         // Call the hosted API
///     }
///     fn model_id(&self) -> &str { "my-model" }
/// }
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one model call.
    ///
    /// # Arguments
    /// * `request` - Messages, advertised tools and tool-choice requirement
    ///
    /// # Returns
    /// * `Ok(ModelResponse)` - Text and/or tool calls, with usage if reported
    /// * `Err(ShiftdeskError::Llm)` - If the call fails
    async fn complete(&self, request: &ModelRequest) -> ShiftdeskResult<ModelResponse>;

    /// Get the model identifier (e.g., "gpt-4o-mini").
    fn model_id(&self) -> &str;
}

// ============================================================================
// PROVIDER REGISTRY
// ============================================================================

/// Registry for language models.
/// Models must be explicitly registered - no auto-discovery.
///
/// The tool-calling model answers the retry protocol; the structured-output
/// model generates note edits and falls back to the tool-calling model.
pub struct ProviderRegistry {
    tool_calling: Option<Arc<dyn LanguageModel>>,
    structured_output: Option<Arc<dyn LanguageModel>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tool_calling: None,
            structured_output: None,
        }
    }

    /// Register the model used for tool calling.
    /// Replaces any previously registered model.
    pub fn register_tool_calling(&mut self, model: Arc<dyn LanguageModel>) {
        self.tool_calling = Some(model);
    }

    /// Register a separate model for structured output.
    pub fn register_structured_output(&mut self, model: Arc<dyn LanguageModel>) {
        self.structured_output = Some(model);
    }

    /// Get the tool-calling model.
    ///
    /// # Returns
    /// * `Err(ShiftdeskError::Llm(LlmError::ProviderNotConfigured))` - If none registered
    pub fn tool_calling(&self) -> ShiftdeskResult<Arc<dyn LanguageModel>> {
        self.tool_calling
            .clone()
            .ok_or(ShiftdeskError::Llm(LlmError::ProviderNotConfigured))
    }

    /// Get the structured-output model, or the tool-calling model if no
    /// dedicated one is registered.
    pub fn structured_output(&self) -> ShiftdeskResult<Arc<dyn LanguageModel>> {
        self.structured_output
            .clone()
            .or_else(|| self.tool_calling.clone())
            .ok_or(ShiftdeskError::Llm(LlmError::ProviderNotConfigured))
    }

    pub fn has_tool_calling(&self) -> bool {
        self.tool_calling.is_some()
    }

    pub fn clear(&mut self) {
        self.tool_calling = None;
        self.structured_output = None;
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tool_calling", &self.tool_calling.as_ref().map(|m| m.model_id().to_string()))
            .field(
                "structured_output",
                &self.structured_output.as_ref().map(|m| m.model_id().to_string()),
            )
            .finish()
    }
}

// ============================================================================
// USAGE TRACKER
// ============================================================================

/// Tracks model calls and token usage across attempts.
/// Thread-safe via atomic operations.
pub struct UsageTracker {
    calls: AtomicI64,
    failed_calls: AtomicI64,
    input_tokens: AtomicI64,
    output_tokens: AtomicI64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            calls: AtomicI64::new(0),
            failed_calls: AtomicI64::new(0),
            input_tokens: AtomicI64::new(0),
            output_tokens: AtomicI64::new(0),
        }
    }

    /// Record a completed call and the usage it reported, if any.
    pub fn record_call(&self, usage: Option<&TokenUsage>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = usage {
            self.input_tokens
                .fetch_add(usage.input_tokens, Ordering::Relaxed);
            self.output_tokens
                .fetch_add(usage.output_tokens, Ordering::Relaxed);
        }
    }

    /// Record a call that raised or timed out.
    pub fn record_failure(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn calls(&self) -> i64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn failed_calls(&self) -> i64 {
        self.failed_calls.load(Ordering::Relaxed)
    }

    pub fn input_tokens(&self) -> i64 {
        self.input_tokens.load(Ordering::Relaxed)
    }

    pub fn output_tokens(&self) -> i64 {
        self.output_tokens.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.failed_calls.store(0, Ordering::Relaxed);
        self.input_tokens.store(0, Ordering::Relaxed);
        self.output_tokens.store(0, Ordering::Relaxed);
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("calls", &self.calls())
            .field("failed_calls", &self.failed_calls())
            .field("input_tokens", &self.input_tokens())
            .field("output_tokens", &self.output_tokens())
            .finish()
    }
}

// ============================================================================
// MOCK PROVIDERS FOR TESTING
// ============================================================================

/// One scripted reaction of a [`ScriptedModel`].
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this response
    Respond(ModelResponse),
    /// Fail with this error
    Fail(ShiftdeskError),
    /// Never complete; used to exercise timeouts and cancellation
    Stall,
}

/// Mock model that replays a fixed script and records every request.
///
/// When the script runs out the last step repeats; an empty script fails
/// every call with `LlmError::ProviderNotConfigured`.
#[derive(Debug)]
pub struct ScriptedModel {
    model_id: String,
    steps: Mutex<VecDeque<ScriptStep>>,
    last: Mutex<Option<ScriptStep>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            model_id: "scripted".to_string(),
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Model that fails every call with `error`.
    pub fn always_failing(error: ShiftdeskError) -> Self {
        Self::new([ScriptStep::Fail(error)])
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.requests).clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let mut last = lock(&self.last);
        match lock(&self.steps).pop_front() {
            Some(step) => {
                *last = Some(step.clone());
                Some(step)
            }
            None => last.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> ShiftdeskResult<ModelResponse> {
        lock(&self.requests).push(request.clone());
        match self.next_step() {
            Some(ScriptStep::Respond(response)) => Ok(response),
            Some(ScriptStep::Fail(error)) => Err(error),
            Some(ScriptStep::Stall) => std::future::pending().await,
            None => Err(ShiftdeskError::Llm(LlmError::ProviderNotConfigured)),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shiftdesk_core::{ConversationMessage, ToolInvocation};

    fn request() -> ModelRequest {
        ModelRequest::completion(vec![ConversationMessage::human("hi")])
    }

    #[test]
    fn test_provider_registry_new_is_empty() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_tool_calling());
        assert!(registry.tool_calling().is_err());
        assert!(registry.structured_output().is_err());
    }

    #[test]
    fn test_structured_output_falls_back_to_tool_calling() {
        let mut registry = ProviderRegistry::new();
        registry.register_tool_calling(Arc::new(ScriptedModel::new([]).with_model_id("main")));
        assert_eq!(registry.structured_output().unwrap().model_id(), "main");

        registry.register_structured_output(Arc::new(
            ScriptedModel::new([]).with_model_id("editor"),
        ));
        assert_eq!(registry.structured_output().unwrap().model_id(), "editor");
        assert_eq!(registry.tool_calling().unwrap().model_id(), "main");

        registry.clear();
        assert!(!registry.has_tool_calling());
    }

    #[test]
    fn test_usage_tracker_basic() {
        let tracker = UsageTracker::new();
        tracker.record_call(Some(&TokenUsage {
            input_tokens: 50,
            output_tokens: 25,
        }));
        tracker.record_call(None);
        tracker.record_failure();
        assert_eq!(tracker.calls(), 3);
        assert_eq!(tracker.failed_calls(), 1);
        assert_eq!(tracker.input_tokens(), 50);
        assert_eq!(tracker.output_tokens(), 25);

        tracker.reset();
        assert_eq!(tracker.calls(), 0);
        assert_eq!(tracker.input_tokens(), 0);
    }

    #[tokio::test]
    async fn test_scripted_model_replays_and_repeats_last_step() {
        let call = ToolInvocation::new("find_tasks", serde_json::json!({}));
        let model = ScriptedModel::new([
            ScriptStep::Respond(ModelResponse::text("plain")),
            ScriptStep::Respond(ModelResponse::with_tool_calls(vec![call.clone()])),
        ]);

        assert_eq!(model.complete(&request()).await.unwrap().content, "plain");
        let second = model.complete(&request()).await.unwrap();
        assert_eq!(second.tool_calls, Some(vec![call.clone()]));
        let third = model.complete(&request()).await.unwrap();
        assert_eq!(third.tool_calls, Some(vec![call]));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let model = ScriptedModel::new([]);
        let err = model.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ShiftdeskError::Llm(LlmError::ProviderNotConfigured)));
        assert_eq!(model.requests().len(), 1);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Usage totals equal the sum of recorded calls.
        #[test]
        fn prop_usage_tracker_sums(
            usages in prop::collection::vec((0i64..10_000, 0i64..10_000), 0..20)
        ) {
            let tracker = UsageTracker::new();
            for (input, output) in &usages {
                tracker.record_call(Some(&TokenUsage {
                    input_tokens: *input,
                    output_tokens: *output,
                }));
            }
            prop_assert_eq!(tracker.calls(), usages.len() as i64);
            prop_assert_eq!(tracker.input_tokens(), usages.iter().map(|u| u.0).sum::<i64>());
            prop_assert_eq!(tracker.output_tokens(), usages.iter().map(|u| u.1).sum::<i64>());
        }
    }
}
