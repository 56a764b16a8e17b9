//! Anthropic (Claude) messages model

use super::client::AnthropicClient;
use super::types::{ContentBlock, Message, MessageRequest, MessageResponse, ToolChoice, ToolSpec};
use crate::LanguageModel;
use async_trait::async_trait;
use shiftdesk_core::{
    ConversationMessage, MessageRole, ModelRequest, ModelResponse, ShiftdeskResult, TokenUsage,
    ToolInvocation,
};

const DEFAULT_MAX_TOKENS: i32 = 1024;

/// Chat model served by the Anthropic `messages` endpoint.
pub struct AnthropicModel {
    client: AnthropicClient,
    model: String,
    max_tokens: i32,
    temperature: Option<f32>,
}

impl AnthropicModel {
    /// # Arguments
    /// * `client` - Rate-limited HTTP client
    /// * `model` - Model name (e.g., "claude-3-5-sonnet-latest")
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Create a model with the default Claude 3.5 Sonnet.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(AnthropicClient::new(api_key, 50), "claude-3-5-sonnet-latest")
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the wire request for `request`.
    ///
    /// System messages are joined into the `system` field. Consecutive
    /// messages with the same role are merged, as the API requires turns to
    /// alternate.
    pub fn message_request(&self, request: &ModelRequest) -> MessageRequest {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut messages: Vec<Message> = Vec::new();
        for message in request.messages.iter().filter(|m| m.role != MessageRole::System) {
            let (role, blocks) = to_blocks(message);
            if blocks.is_empty() {
                continue;
            }
            match messages.last_mut() {
                Some(last) if last.role == role => last.content.extend(blocks),
                _ => messages.push(Message {
                    role: role.to_string(),
                    content: blocks,
                }),
            }
        }

        let tools: Vec<ToolSpec> = request
            .tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.parameters.clone(),
            })
            .collect();
        let tool_choice = (request.require_tool_call && !tools.is_empty()).then_some(ToolChoice::Any);

        MessageRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            temperature: self.temperature,
            tools,
            tool_choice,
        }
    }
}

fn to_blocks(message: &ConversationMessage) -> (&'static str, Vec<ContentBlock>) {
    let text = |content: &str| {
        (!content.trim().is_empty()).then(|| ContentBlock::Text {
            text: content.to_string(),
        })
    };
    match message.role {
        MessageRole::Ai => {
            let mut blocks: Vec<ContentBlock> = text(&message.content).into_iter().collect();
            blocks.extend(message.tool_calls.iter().filter_map(|call| {
                call.id.as_ref().map(|id| ContentBlock::ToolUse {
                    id: id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                })
            }));
            ("assistant", blocks)
        }
        MessageRole::Tool => match &message.tool_call_id {
            Some(id) => (
                "user",
                vec![ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: message.content.clone(),
                }],
            ),
            None => ("user", text(&format!("Tool result: {}", message.content)).into_iter().collect()),
        },
        MessageRole::Human | MessageRole::System => {
            ("user", text(&message.content).into_iter().collect())
        }
    }
}

/// Convert a wire response into a [`ModelResponse`]. Responses without any
/// `tool_use` block carry no tool calls.
pub fn from_message_response(response: MessageResponse) -> ModelResponse {
    let mut texts = Vec::new();
    let mut calls = Vec::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => calls.push(ToolInvocation {
                id: Some(id),
                name,
                arguments: input,
            }),
            ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
        }
    }

    ModelResponse {
        content: texts.join("\n"),
        tool_calls: (!calls.is_empty()).then_some(calls),
        usage: Some(TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        }),
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    async fn complete(&self, request: &ModelRequest) -> ShiftdeskResult<ModelResponse> {
        let body = self.message_request(request);
        let response: MessageResponse = self.client.request("messages", &body).await?;
        Ok(from_message_response(response))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("client", &self.client)
            .finish()
    }
}
