//! 单轮对话上下文
//!
//! 每轮重新构建：system prompt + UI 传入的历史 + 本轮用户消息；工具轮次把 assistant 的调用请求
//! 与各工具结果按请求顺序追加在末尾。轮次结束即丢弃，历史以 UI 为准。

use crate::chat::{HistoryEntry, Message, ToolCallRequest};
use crate::tools::ToolInvocationResult;

#[derive(Clone, Debug, Default)]
pub struct TurnContext {
    messages: Vec<Message>,
}

impl TurnContext {
    pub fn new(system_prompt: String, history: Vec<HistoryEntry>, user_message: &str) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.into_iter().map(Message::from));
        messages.push(Message::user(user_message));
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 追加一个工具轮次：先 assistant 的调用请求，再逐个 tool 结果（与请求同序）
    pub fn push_tool_round(
        &mut self,
        assistant_content: Option<String>,
        calls: Vec<ToolCallRequest>,
        results: &[ToolInvocationResult],
    ) {
        self.messages
            .push(Message::assistant_tool_calls(assistant_content, calls));
        self.messages
            .extend(results.iter().map(ToolInvocationResult::to_message));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_context_layout() {
        let history = vec![
            HistoryEntry {
                role: Role::User,
                content: "hello".to_string(),
            },
            HistoryEntry {
                role: Role::Assistant,
                content: "hi there".to_string(),
            },
        ];
        let ctx = TurnContext::new("SYS".to_string(), history, "what do you do?");

        let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(ctx.messages()[0].content, "SYS");
        assert_eq!(ctx.messages()[3].content, "what do you do?");
    }

    #[test]
    fn test_tool_round_appends_in_order() {
        let mut ctx = TurnContext::new("SYS".to_string(), Vec::new(), "hi");
        let calls = vec![
            ToolCallRequest::new("a", "t", "{}"),
            ToolCallRequest::new("b", "t", "{}"),
        ];
        let results = vec![
            ToolInvocationResult {
                call_id: "a".to_string(),
                tool_name: "t".to_string(),
                payload: serde_json::json!({"n": 1}),
            },
            ToolInvocationResult {
                call_id: "b".to_string(),
                tool_name: "t".to_string(),
                payload: serde_json::json!({"n": 2}),
            },
        ];
        ctx.push_tool_round(None, calls, &results);

        assert_eq!(ctx.len(), 5);
        assert_eq!(ctx.messages()[2].tool_calls.len(), 2);
        assert_eq!(ctx.messages()[3].tool_call_id.as_deref(), Some("a"));
        assert_eq!(ctx.messages()[4].tool_call_id.as_deref(), Some("b"));
    }
}
