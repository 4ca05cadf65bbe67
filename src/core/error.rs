//! Agent 错误类型
//!
//! 只有「整轮失败」才会以 AgentError 返回；工具层与投递层的错误在各自模块内就地转为结构化结果，不会冒泡到这里。

use thiserror::Error;

use crate::llm::LlmError;

/// 单轮对话的致命错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型调用本身失败（网络、鉴权、限流等）
    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    /// 模型既没有给出回复文本，也没有给出有效的工具调用
    #[error("Model protocol error: {0}")]
    ProtocolError(String),

    /// 工具轮次超过上限
    #[error("Tool round limit exceeded ({0} rounds)")]
    MaxRoundsExceeded(usize),
}
