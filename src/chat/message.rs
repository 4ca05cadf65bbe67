//! 对话消息
//!
//! 与 OpenAI Chat Completions 的消息结构一一对应：system / user / assistant / tool 四种角色，
//! assistant 可携带工具调用请求，tool 消息携带对应的 tool_call_id。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 模型发起的一次工具调用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// 调用 id，工具结果通过它与请求对应
    pub id: String,
    /// 工具名
    pub name: String,
    /// 模型给出的原始参数（JSON 字符串，尚未校验）
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// assistant 消息附带的工具调用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// tool 消息对应的调用 id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// assistant 发起工具调用的消息（content 可为空）
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.unwrap_or_default(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// UI 传入的历史消息：只有 role + content
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    /// UI 历史只允许 user / assistant；system 由服务端生成，tool 消息缺少调用 id
    pub fn is_conversational(&self) -> bool {
        matches!(self.role, Role::User | Role::Assistant)
    }
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        Message::plain(entry.role, entry.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::tool("call_1", "{}")).unwrap();
        assert!(json.contains(r#""role":"tool""#));
        assert!(json.contains(r#""tool_call_id":"call_1""#));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_history_entry_deserializes() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        let msg: Message = entry.into();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn test_history_roles_restricted_to_dialogue() {
        let entry = |role| HistoryEntry {
            role,
            content: "x".to_string(),
        };
        assert!(entry(Role::User).is_conversational());
        assert!(entry(Role::Assistant).is_conversational());
        assert!(!entry(Role::System).is_conversational());
        assert!(!entry(Role::Tool).is_conversational());
    }
}
