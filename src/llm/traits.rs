//! 模型客户端抽象
//!
//! 核心循环只依赖 ModelClient::complete：传入完整消息序列与工具目录，得到一次补全结果。
//! 重试、退避等属于具体实现或外部网关的职责，这里不涉及。

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::{Message, ToolCallRequest};
use crate::tools::ToolDescriptor;

/// 模型调用错误
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Empty response: no choices returned")]
    EmptyResponse,
}

/// 补全结束原因
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

/// 一次补全结果
#[derive(Clone, Debug)]
pub struct ModelResponse {
    pub finish_reason: FinishReason,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelResponse {
    /// 直接回复
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Stop,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// 请求调用工具
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            finish_reason: FinishReason::ToolCalls,
            content: None,
            tool_calls,
        }
    }
}

/// 模型客户端 trait
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError>;

    /// 累计 token 使用：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
