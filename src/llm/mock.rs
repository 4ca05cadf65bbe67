//! Mock 模型客户端（用于测试，无需 API）
//!
//! 按脚本依次返回预设响应，并记录每次收到的消息序列；脚本耗尽后返回 fallback（若有），否则报错。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::chat::Message;
use crate::llm::{LlmError, ModelClient, ModelResponse};
use crate::tools::ToolDescriptor;

/// 一次调用的记录
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// 脚本化 Mock 客户端（Clone 后共享同一脚本与记录）
#[derive(Clone, Default)]
pub struct MockModelClient {
    script: Arc<Mutex<VecDeque<Result<ModelResponse, LlmError>>>>,
    fallback: Option<ModelResponse>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            ..Self::default()
        }
    }

    /// 每次都返回同一个响应（用于轮次上限测试）
    pub fn always(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// 在脚本末尾追加一次失败
    pub fn then_fail(self, err: LlmError) -> Self {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });

        let next = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::Request("mock script exhausted".to_string())),
        }
    }
}
