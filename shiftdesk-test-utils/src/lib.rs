//! SHIFTDESK Test Utilities
//!
//! Shared test infrastructure for the Shiftdesk workspace:
//! - Proptest generators for envelopes, arguments and dates
//! - Test fixtures for contexts, conversations and configs
//! - Custom assertions for envelopes and retry outcomes

// Re-export core types for convenience
pub use shiftdesk_core::{
    ActionRequestType, ArgValue, ContextWindow, ConversationMessage, InfoRequestType,
    InvocationError, ModelResponse, ProviderConfig, ProviderKind, RequestArgs, RequestEnvelope,
    RequestKind, RetryConfig, ShiftdeskError, ShiftdeskResult, TaskPriority, TaskStatus,
    ToolContext, ToolError, ToolInvocation, UiActionType,
};
pub use shiftdesk_llm::{RetryOutcome, ScriptStep, ScriptedModel};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for envelope and argument types.

    use super::*;
    use proptest::prelude::*;

    // === Enum Generators ===

    /// Generate a RequestKind variant.
    pub fn arb_request_kind() -> impl Strategy<Value = RequestKind> {
        prop::sample::select(RequestKind::ALL.to_vec())
    }

    /// Generate a kind together with one of its legal subtype wire strings.
    pub fn arb_kind_and_subtype() -> impl Strategy<Value = (RequestKind, &'static str)> {
        arb_request_kind().prop_flat_map(|kind| {
            prop::sample::select(kind.subtypes()).prop_map(move |subtype| (kind, subtype))
        })
    }

    /// Generate a kind with a subtype wire string that belongs to another kind.
    pub fn arb_mismatched_subtype() -> impl Strategy<Value = (RequestKind, &'static str)> {
        arb_request_kind().prop_flat_map(|kind| {
            let foreign: Vec<&'static str> = RequestKind::ALL
                .iter()
                .filter(|other| **other != kind)
                .flat_map(|other| other.subtypes())
                .filter(|subtype| !kind.subtypes().contains(subtype))
                .collect();
            prop::sample::select(foreign).prop_map(move |subtype| (kind, subtype))
        })
    }

    /// Generate a TaskPriority variant.
    pub fn arb_task_priority() -> impl Strategy<Value = TaskPriority> {
        prop::sample::select(TaskPriority::ALL.to_vec())
    }

    /// Generate a TaskStatus variant.
    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(TaskStatus::ALL.to_vec())
    }

    // === Argument Generators ===

    /// Generate an argument key.
    pub fn arb_arg_key() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{0,23}"
    }

    /// Generate a single argument value.
    pub fn arb_arg_value() -> impl Strategy<Value = ArgValue> {
        prop_oneof![
            any::<bool>().prop_map(ArgValue::Flag),
            any::<i64>().prop_map(ArgValue::Integer),
            ".{0,40}".prop_map(ArgValue::Text),
            prop::collection::vec(".{0,20}", 0..4).prop_map(ArgValue::List),
        ]
    }

    /// Generate an argument map; some entries are explicit nulls.
    pub fn arb_request_args() -> impl Strategy<Value = RequestArgs> {
        prop::collection::btree_map(arb_arg_key(), prop::option::of(arb_arg_value()), 0..6)
    }

    /// Generate any valid envelope.
    pub fn arb_envelope() -> impl Strategy<Value = RequestEnvelope> {
        (
            arb_kind_and_subtype(),
            prop::option::of(arb_request_args()),
            any::<bool>(),
        )
            .prop_filter_map("subtype must build", |((kind, subtype), args, show_only)| {
                let show_only = (kind == RequestKind::Info).then_some(show_only);
                RequestEnvelope::build(kind, subtype, args, show_only).ok()
            })
    }

    // === Date Generators ===

    /// Generate a calendar date between 2020 and 2030.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030, 1u32..=12, 1u32..=28)
            .prop_filter_map("valid date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
    }

    /// Generate a date rendered in one of the accepted input formats,
    /// together with the date it should parse to.
    pub fn arb_date_input() -> impl Strategy<Value = (String, NaiveDate)> {
        (arb_date(), 0u8..3).prop_map(|(date, format)| {
            let rendered = match format {
                0 => date.format("%Y-%m-%d").to_string(),
                1 => date.format("%Y/%m/%d").to_string(),
                _ => format!("{}T09:30:00Z", date.format("%Y-%m-%d")),
            };
            (rendered, date)
        })
    }

    /// Generate a ToolContext pinned to a timestamp between 2020 and 2030.
    pub fn arb_tool_context() -> impl Strategy<Value = ToolContext> {
        (1_577_836_800i64..1_893_456_000i64, -720i32..=840).prop_map(|(secs, offset)| {
            let now = DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now);
            ToolContext::new("user-1", "org-1")
                .with_timezone_offset(offset)
                .at(now)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Fixed instant used by the fixtures: Friday, 14 March 2025 09:15 UTC.
    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 15, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Context of a UTC user at [`fixed_now`].
    pub fn tool_context() -> ToolContext {
        ToolContext::new("user-1", "org-1").at(fixed_now())
    }

    /// Context of a user at UTC-5 with language and UI context set.
    pub fn localized_context() -> ToolContext {
        ToolContext::new("user-2", "org-1")
            .with_timezone_offset(-300)
            .with_language("es")
            .with_ui_context("Task list, filter: open")
            .at(fixed_now())
    }

    /// A short conversation ending with the user's request.
    pub fn conversation(request: &str) -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::human("Hi"),
            ConversationMessage::ai("Hello! How can I help?"),
            ConversationMessage::human(request),
        ]
    }

    /// The `create_task` invocation for "Review PR".
    pub fn review_pr_invocation() -> ToolInvocation {
        ToolInvocation::new(
            "create_task",
            serde_json::json!({"task_name": "Review PR", "assigned_user_names": ["MYSELF"]}),
        )
        .with_id("call_review_pr")
    }

    /// Retry configuration with the default budget of three attempts.
    pub fn retry_config() -> RetryConfig {
        RetryConfig::default()
    }

    /// A valid OpenAI provider configuration.
    pub fn openai_provider() -> ProviderConfig {
        ProviderConfig {
            provider_type: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            requests_per_minute: 60,
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    /// A model that answers the first attempt with an empty tool call list
    /// and then calls `create_task`.
    pub fn flaky_review_pr_model() -> ScriptedModel {
        ScriptedModel::new(vec![
            ScriptStep::Respond(ModelResponse::with_tool_calls(vec![])),
            ScriptStep::Respond(ModelResponse::with_tool_calls(vec![review_pr_invocation()])),
        ])
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for envelopes and retry outcomes.

    use super::*;

    /// Assert that an envelope survives serialization unchanged.
    #[track_caller]
    pub fn assert_wire_round_trip(envelope: &RequestEnvelope) {
        let wire = match envelope.to_wire_string() {
            Ok(wire) => wire,
            Err(e) => panic!("Envelope failed to serialize: {}", e),
        };
        match RequestEnvelope::from_wire_str(&wire) {
            Ok(parsed) => assert_eq!(&parsed, envelope, "Round trip changed envelope: {}", wire),
            Err(e) => panic!("Envelope failed to parse back: {} ({})", e, wire),
        }
    }

    /// Assert that the wire form carries `show_only` exactly for info requests.
    #[track_caller]
    pub fn assert_show_only_placement(envelope: &RequestEnvelope) {
        let wire = match envelope.to_wire_string() {
            Ok(wire) => wire,
            Err(e) => panic!("Envelope failed to serialize: {}", e),
        };
        let value: serde_json::Value = match serde_json::from_str(&wire) {
            Ok(value) => value,
            Err(e) => panic!("Wire form is not JSON: {}", e),
        };
        let has_show_only = value.get("show_only").is_some();
        assert_eq!(
            has_show_only,
            envelope.kind() == RequestKind::Info,
            "show_only placement wrong for {}",
            wire
        );
    }

    /// Assert that a result is a ToolError::InvalidArguments for `tool`.
    #[track_caller]
    pub fn assert_invalid_arguments<T: std::fmt::Debug>(result: &ShiftdeskResult<T>, tool: &str) {
        match result {
            Err(ShiftdeskError::Tool(ToolError::InvalidArguments { tool: t, .. })) => {
                assert_eq!(t, tool, "Wrong tool in InvalidArguments error");
            }
            other => panic!("Expected InvalidArguments for {}, got: {:?}", tool, other),
        }
    }

    /// Assert that a retry outcome succeeded after exactly `attempts` attempts.
    #[track_caller]
    pub fn assert_succeeded_after(outcome: &RetryOutcome, attempts: u32) {
        match outcome {
            RetryOutcome::Succeeded { attempts: a, .. } => {
                assert_eq!(*a, attempts, "Wrong attempt count");
            }
            other => panic!("Expected success after {} attempts, got: {:?}", attempts, other),
        }
    }

    /// Assert that a retry outcome was exhausted after `attempts` attempts.
    #[track_caller]
    pub fn assert_exhausted_after(outcome: &RetryOutcome, attempts: u32) {
        match outcome {
            RetryOutcome::Exhausted(report) => {
                assert_eq!(report.attempts, attempts, "Wrong attempt count");
            }
            other => panic!("Expected exhaustion after {} attempts, got: {:?}", attempts, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_now_fixture() {
        assert_eq!(fixtures::fixed_now().to_rfc3339(), "2025-03-14T09:15:00+00:00");
        assert_eq!(fixtures::tool_context().today(), NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_localized_context_fixture() {
        let ctx = fixtures::localized_context();
        assert_eq!(ctx.language.as_deref(), Some("es"));
        assert_eq!(ctx.local_now().format("%H:%M").to_string(), "04:15");
    }

    #[test]
    fn test_config_fixtures_are_valid() {
        assert!(fixtures::retry_config().validate().is_ok());
        assert!(fixtures::openai_provider().validate().is_ok());
    }

    #[test]
    fn test_conversation_fixture_ends_with_request() {
        let history = fixtures::conversation("Create a task to review the PR");
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].content, "Create a task to review the PR");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_envelopes_are_valid(envelope in generators::arb_envelope()) {
            prop_assert!(envelope.kind().subtypes().contains(&envelope.subtype()));
        }

        #[test]
        fn prop_mismatched_subtypes_are_foreign((kind, subtype) in generators::arb_mismatched_subtype()) {
            prop_assert!(!kind.subtypes().contains(&subtype));
        }

        #[test]
        fn prop_date_inputs_render_known_formats((input, date) in generators::arb_date_input()) {
            prop_assert!(input.starts_with(&date.format("%Y").to_string()));
        }
    }
}
