//! 单轮对话的状态定义
//!
//! ConversationLoop 在 AwaitingModel / HandlingTools / Done 之间迁移；TurnOutcome 是一轮结束时的投影。

use serde::Serialize;

/// 对话循环阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TurnPhase {
    AwaitingModel,
    HandlingTools,
    Done,
}

/// 一轮对话的结果
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    /// 返回给访客的文本（模型原文，或固定的会话关闭提示）
    pub reply: String,
    /// 本轮结束后会话是否已关闭
    pub closed: bool,
    /// 本轮实际执行的工具轮次
    pub tool_rounds: usize,
    /// 本轮调用模型的次数（会话已关闭时为 0）
    pub model_calls: usize,
}

impl TurnOutcome {
    pub fn closed_session(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            closed: true,
            tool_rounds: 0,
            model_calls: 0,
        }
    }
}
