//! One instruction through the retry protocol and the tool executor.

use crate::args::CliArgs;
use crate::config::CliConfig;
use crate::error::CliError;
use chrono::Utc;
use shiftdesk_core::{
    ConversationMessage, NoteEditError, ProviderConfig, ShiftdeskError, ToolContext,
};
use shiftdesk_llm::providers::build_model;
use shiftdesk_llm::{
    LanguageModel, NoteEditPlanner, ProviderRegistry, RetryOutcome, ToolCallRequest, ToolCaller,
    UsageTracker,
};
use shiftdesk_tools::{InMemoryNoteSource, ToolExecutor, ToolOutput};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build the provider registry from config, reading API keys from the
/// environment.
pub fn registry_from_config(config: &CliConfig) -> Result<ProviderRegistry, CliError> {
    let mut registry = ProviderRegistry::new();
    registry.register_tool_calling(model_from_env(&config.provider)?);
    if let Some(provider) = &config.note_edit_provider {
        registry.register_structured_output(model_from_env(provider)?);
    }
    Ok(registry)
}

fn model_from_env(provider: &ProviderConfig) -> Result<Arc<dyn LanguageModel>, CliError> {
    let api_key = std::env::var(&provider.api_key_env).map_err(|_| CliError::MissingApiKey {
        var: provider.api_key_env.clone(),
    })?;
    Ok(build_model(provider, api_key))
}

/// Context of the configured user at the current instant.
pub fn tool_context(config: &CliConfig, args: &CliArgs) -> ToolContext {
    let mut ctx = ToolContext::new(&config.user.user_id, &config.user.org_id)
        .with_timezone_offset(config.user.timezone_offset_minutes)
        .at(Utc::now());
    if let Some(language) = &config.user.language {
        ctx = ctx.with_language(language);
    }
    if let Some(ui_context) = &args.ui_context {
        ctx = ctx.with_ui_context(ui_context);
    }
    ctx
}

/// Executor wired with the configured notes and the note-edit model.
pub fn executor_from_config(
    config: &CliConfig,
    registry: &ProviderRegistry,
) -> Result<ToolExecutor, CliError> {
    let source = InMemoryNoteSource::new();
    for note in &config.notes {
        source.insert(&config.user.org_id, &note.id, &note.description);
    }
    let planner = NoteEditPlanner::new(registry.structured_output()?)
        .with_max_retries(config.note_edit.max_retries);
    Ok(ToolExecutor::new()
        .with_note_source(Arc::new(source))
        .with_note_editor(Arc::new(planner)))
}

/// Run one instruction and return the client envelopes it produced.
///
/// # Returns
/// * `Ok(Vec<ToolOutput>)` - One output per tool invocation, in order
/// * `Err(CliError::Exhausted)` - If no valid tool call was produced
/// * `Err(CliError::Cancelled)` - If `cancel` fired during tool calling or
///   while a note edit was being generated
pub async fn run(
    config: &CliConfig,
    args: &CliArgs,
    registry: &ProviderRegistry,
    ctx: &ToolContext,
    cancel: &CancellationToken,
) -> Result<Vec<ToolOutput>, CliError> {
    let executor = executor_from_config(config, registry)?;
    let usage = Arc::new(UsageTracker::new());
    let caller = ToolCaller::new(
        registry.tool_calling()?,
        executor.definitions(),
        config.retry.clone(),
    )
    .with_usage_tracker(usage.clone());

    let conversation = vec![ConversationMessage::human(&args.instruction)];
    let mut request = ToolCallRequest::new(&args.instruction, &conversation, ctx);
    if let Some(plan) = &args.plan {
        request = request.with_plan(plan);
    }

    let outcome = caller.call(&request, cancel).await;
    info!(
        user_id = %ctx.user_id,
        attempts = outcome.attempts(),
        model_calls = usage.calls(),
        input_tokens = usage.input_tokens(),
        output_tokens = usage.output_tokens(),
        "Tool calling finished"
    );

    match outcome {
        RetryOutcome::Succeeded { invocations, .. } => executor
            .execute_all_cancellable(&invocations, ctx, cancel)
            .await
            .map_err(|e| match e {
                ShiftdeskError::NoteEdit(NoteEditError::Cancelled { attempts }) => {
                    CliError::Cancelled { attempts }
                }
                other => other.into(),
            }),
        RetryOutcome::Exhausted(report) => {
            let report_json = serde_json::to_string(&report).unwrap_or_default();
            warn!(
                attempts = report.attempts,
                error = report.error_tag(),
                routing_hint = %report.routing_hint,
                report = %report_json,
                "Tool calling exhausted"
            );
            Err(CliError::Exhausted {
                attempts: report.attempts,
            })
        }
        RetryOutcome::Cancelled { attempts } => Err(CliError::Cancelled { attempts }),
    }
}
