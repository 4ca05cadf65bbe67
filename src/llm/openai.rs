//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），带 function calling：
//! 消息与工具目录转换为 API 格式，响应中的 finish_reason / content / tool_calls 映射为 ModelResponse。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason as ApiFinishReason, FunctionCall,
    FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::chat::{Message, Role, ToolCallRequest};
use crate::llm::{FinishReason, LlmError, ModelClient, ModelResponse};
use crate::tools::ToolDescriptor;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

fn build_err(e: OpenAIError) -> LlmError {
    LlmError::InvalidRequest(e.to_string())
}

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    pub usage: TokenUsage,
}

impl OpenAiClient {
    /// request_timeout 作用于每次 HTTP 请求
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &SecretString,
        request_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let mut config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client: Client::with_config(config).with_http_client(http),
            model: model.to_string(),
            usage: TokenUsage::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let msg = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(build_err)?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(build_err)?,
                    ),
                    Role::Assistant => {
                        let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                        if !m.content.is_empty() {
                            args.content(m.content.clone());
                        }
                        if !m.tool_calls.is_empty() {
                            args.tool_calls(
                                m.tool_calls
                                    .iter()
                                    .map(|tc| ChatCompletionMessageToolCall {
                                        id: tc.id.clone(),
                                        r#type: ChatCompletionToolType::Function,
                                        function: FunctionCall {
                                            name: tc.name.clone(),
                                            arguments: tc.arguments.clone(),
                                        },
                                    })
                                    .collect::<Vec<_>>(),
                            );
                        }
                        ChatCompletionRequestMessage::Assistant(args.build().map_err(build_err)?)
                    }
                    Role::Tool => ChatCompletionRequestMessage::Tool(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
                            .content(m.content.clone())
                            .build()
                            .map_err(build_err)?,
                    ),
                };
                Ok(msg)
            })
            .collect()
    }

    fn to_openai_tools(tools: &[ToolDescriptor]) -> Result<Vec<ChatCompletionTool>, LlmError> {
        tools
            .iter()
            .map(|t| {
                let function = FunctionObjectArgs::default()
                    .name(t.name.clone())
                    .description(t.description.clone())
                    .parameters(t.parameters.clone())
                    .build()
                    .map_err(build_err)?;
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()
                    .map_err(build_err)
            })
            .collect()
    }
}

fn map_finish_reason(reason: Option<ApiFinishReason>) -> FinishReason {
    match reason {
        Some(ApiFinishReason::Stop) | None => FinishReason::Stop,
        Some(ApiFinishReason::ToolCalls) => FinishReason::ToolCalls,
        Some(ApiFinishReason::Length) => FinishReason::Length,
        Some(ApiFinishReason::ContentFilter) => FinishReason::ContentFilter,
        Some(other) => FinishReason::Other(format!("{other:?}")),
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(self.to_openai_messages(messages)?);
        if !tools.is_empty() {
            args.tools(Self::to_openai_tools(tools)?);
        }
        let request = args.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        Ok(ModelResponse {
            finish_reason: map_finish_reason(choice.finish_reason),
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_finish_reason() {
        assert_eq!(map_finish_reason(None), FinishReason::Stop);
        assert_eq!(
            map_finish_reason(Some(ApiFinishReason::ToolCalls)),
            FinishReason::ToolCalls
        );
        assert_eq!(
            map_finish_reason(Some(ApiFinishReason::Length)),
            FinishReason::Length
        );
    }

    #[test]
    fn test_messages_convert_with_tool_round() {
        let key = SecretString::from("sk-test".to_string());
        let client =
            OpenAiClient::new(None, "gpt-4o-mini", &key, Duration::from_secs(5)).unwrap();
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant_tool_calls(
                None,
                vec![ToolCallRequest::new("call_1", "stop_conversation", "{}")],
            ),
            Message::tool("call_1", r#"{"stopped":true}"#),
        ];
        let converted = client.to_openai_messages(&messages).unwrap();
        assert_eq!(converted.len(), 4);
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));
    }
}
