//! OpenAI chat completions model

use super::client::OpenAIClient;
use super::types::{ChatMessage, ChatRequest, ChatResponse, FunctionCall, FunctionSpec, ToolCall, ToolSpec};
use crate::providers::invalid_response;
use crate::LanguageModel;
use async_trait::async_trait;
use shiftdesk_core::{
    ConversationMessage, MessageRole, ModelRequest, ModelResponse, ShiftdeskResult, TokenUsage,
    ToolInvocation,
};

/// Chat model served by an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<i32>,
}

impl OpenAIChatModel {
    /// # Arguments
    /// * `client` - Rate-limited HTTP client
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Create a model with the default gpt-4o-mini.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(OpenAIClient::new(api_key, 60), "gpt-4o-mini")
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<i32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build the wire request for `request`.
    pub fn chat_request(&self, request: &ModelRequest) -> ChatRequest {
        let tools: Vec<ToolSpec> = request
            .tools
            .iter()
            .map(|tool| ToolSpec {
                r#type: "function".to_string(),
                function: FunctionSpec {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect();
        let tool_choice = (request.require_tool_call && !tools.is_empty()).then(|| "required".to_string());

        ChatRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(to_chat_message).collect(),
            tools,
            tool_choice,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn to_chat_message(message: &ConversationMessage) -> ChatMessage {
    match message.role {
        MessageRole::Tool if message.tool_call_id.is_some() => ChatMessage {
            role: "tool".to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: message.tool_call_id.clone(),
        },
        // A tool result without a call id cannot be linked to a call.
        MessageRole::Tool => ChatMessage {
            role: "user".to_string(),
            content: Some(format!("Tool result: {}", message.content)),
            tool_calls: None,
            tool_call_id: None,
        },
        MessageRole::Ai => ChatMessage {
            role: "assistant".to_string(),
            content: Some(message.content.clone()),
            tool_calls: (!message.tool_calls.is_empty()).then(|| {
                message
                    .tool_calls
                    .iter()
                    .map(|call| ToolCall {
                        id: call.id.clone(),
                        r#type: "function".to_string(),
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: None,
        },
        MessageRole::System | MessageRole::Human => ChatMessage {
            role: if message.role == MessageRole::System { "system" } else { "user" }.to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
    }
}

/// Convert a wire response into a [`ModelResponse`].
///
/// Arguments that are not valid JSON are kept as a JSON string so the retry
/// protocol reports the call as incomplete.
pub fn from_chat_response(response: ChatResponse) -> ShiftdeskResult<ModelResponse> {
    let usage = response.usage.as_ref().map(|usage| TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens.unwrap_or(0),
    });
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| invalid_response("openai", "No completion in response"))?;

    let tool_calls = choice.message.tool_calls.map(|calls| {
        calls
            .into_iter()
            .map(|call| {
                let raw = call.function.arguments;
                let arguments = if raw.trim().is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
                };
                ToolInvocation {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect()
    });

    Ok(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
    })
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn complete(&self, request: &ModelRequest) -> ShiftdeskResult<ModelResponse> {
        let body = self.chat_request(request);
        let response: ChatResponse = self.client.request("chat/completions", &body).await?;
        from_chat_response(response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAIChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatModel")
            .field("model", &self.model)
            .field("client", &self.client)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shiftdesk_core::ToolDefinition;

    fn model() -> OpenAIChatModel {
        OpenAIChatModel::new(OpenAIClient::new("k", 60), "gpt-4o-mini").with_temperature(Some(0.0))
    }

    fn tool() -> ToolDefinition {
        ToolDefinition {
            name: "create_task".to_string(),
            description: "Create a task".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_tool_call_request_forces_tool_choice() {
        let request = ModelRequest::tool_call(
            vec![ConversationMessage::system("sys"), ConversationMessage::human("hi")],
            vec![tool()],
        );
        let body = serde_json::to_value(model().chat_request(&request)).unwrap();
        assert_eq!(body["tool_choice"], "required");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "create_task");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.0);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_completion_request_has_no_tools() {
        let request = ModelRequest::completion(vec![ConversationMessage::human("hi")]);
        let body = serde_json::to_value(model().chat_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_history_tool_messages() {
        let call = ToolInvocation::new("find_tasks", json!({"task_name": "x"})).with_id("call_1");
        let request = ModelRequest::completion(vec![
            ConversationMessage::ai_with_tool_calls("", vec![call]),
            ConversationMessage::tool("{}", Some("call_1".to_string())),
            ConversationMessage::tool("{}", None),
        ]);
        let body = serde_json::to_value(model().chat_request(&request)).unwrap();
        assert_eq!(body["messages"][0]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            body["messages"][0]["tool_calls"][0]["function"]["arguments"],
            r#"{"task_name":"x"}"#
        );
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
        assert_eq!(body["messages"][2]["role"], "user");
    }

    #[test]
    fn test_response_conversion() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "create_task", "arguments": "{\"task_name\":\"Review PR\"}"}},
                        {"id": "call_2", "type": "function",
                         "function": {"name": "find_tasks", "arguments": "{not json"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }))
        .unwrap();

        let converted = from_chat_response(response).unwrap();
        let calls = converted.tool_calls.unwrap();
        assert_eq!(calls[0].arguments, json!({"task_name": "Review PR"}));
        assert_eq!(calls[1].arguments, json!("{not json"));
        assert_eq!(converted.content, "");
        assert_eq!(converted.usage.unwrap().input_tokens, 120);
    }

    #[test]
    fn test_response_without_tool_calls_field() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Sure!"}}]
        }))
        .unwrap();
        let converted = from_chat_response(response).unwrap();
        assert_eq!(converted.tool_calls, None);
        assert_eq!(converted.content, "Sure!");
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(from_chat_response(response).is_err());
    }
}
