//! stop_conversation：访客出现不尊重或恶意言论时关闭会话
//!
//! 工具本身只返回 `{"stopped":true,"reason":...}`；真正的关闭由 dispatcher 根据 SideEffect::Terminate
//! 置位、ConversationLoop 在本轮结束时写入 SessionStateStore。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{SideEffect, Tool, ToolOutput};

const DEFAULT_REASON: &str = "disrespect";

#[derive(Deserialize)]
struct StopArgs {
    reason: Option<String>,
}

pub struct StopConversationTool;

#[async_trait]
impl Tool for StopConversationTool {
    fn name(&self) -> &str {
        "stop_conversation"
    }

    fn description(&self) -> &str {
        "Use this tool to stop the conversation and disable further chat when the user is disrespectful or toxic"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": {
                    "type": "string",
                    "description": "Why the conversation was stopped"
                }
            },
            "required": [],
            "additionalProperties": false
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Terminate
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: StopArgs =
            serde_json::from_value(args).map_err(|e| format!("stop_conversation: {e}"))?;
        let reason = args.reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
        tracing::warn!("Conversation stopped: {}", reason);
        Ok(ToolOutput::new(json!({"stopped": true, "reason": reason})))
    }
}
