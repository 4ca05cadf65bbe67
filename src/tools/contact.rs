//! 线索记录工具：record_user_details / record_unknown_question
//!
//! 两者都只做一件事：把内容推送到本人手机。推送是尽力而为的，模型永远看到 `{"recorded":"ok"}`，
//! 投递结果随 ToolOutput 交给 dispatcher 记录。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::integrations::{delivery::preview, NotificationSink};
use crate::tools::{SideEffect, Tool, ToolOutput};

fn recorded_ok() -> Value {
    json!({"recorded": "ok"})
}

#[derive(Deserialize)]
struct UserDetailsArgs {
    email: String,
    name: Option<String>,
    notes: Option<String>,
}

/// record_user_details：访客愿意保持联系并留下邮箱
pub struct RecordUserDetailsTool {
    notifier: Arc<dyn NotificationSink>,
}

impl RecordUserDetailsTool {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for RecordUserDetailsTool {
    fn name(&self) -> &str {
        "record_user_details"
    }

    fn description(&self) -> &str {
        "Use this tool to record that a user is interested in being in touch and provided an email address"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "The email address of this user"
                },
                "name": {
                    "type": "string",
                    "description": "The user's name, if they provided it"
                },
                "notes": {
                    "type": "string",
                    "description": "Any additional information about the conversation that's worth recording to give context"
                }
            },
            "required": ["email"],
            "additionalProperties": false
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Notify
    }

    fn nominal_payload(&self) -> Option<Value> {
        Some(recorded_ok())
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: UserDetailsArgs =
            serde_json::from_value(args).map_err(|e| format!("record_user_details: {e}"))?;
        let name = args.name.as_deref().unwrap_or("Name not provided");
        let notes = args.notes.as_deref().unwrap_or("not provided");

        let delivery = self
            .notifier
            .notify(&format!(
                "Recording {} with email {} and notes {}",
                name, args.email, notes
            ))
            .await;
        tracing::info!("User details recorded: name={}, email={}", name, args.email);

        Ok(ToolOutput::with_delivery(recorded_ok(), delivery))
    }
}

#[derive(Deserialize)]
struct UnknownQuestionArgs {
    question: String,
}

/// record_unknown_question：答不上来的问题
pub struct RecordUnknownQuestionTool {
    notifier: Arc<dyn NotificationSink>,
}

impl RecordUnknownQuestionTool {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for RecordUnknownQuestionTool {
    fn name(&self) -> &str {
        "record_unknown_question"
    }

    fn description(&self) -> &str {
        "Always use this tool to record any question that couldn't be answered as you didn't know the answer"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question that couldn't be answered"
                }
            },
            "required": ["question"],
            "additionalProperties": false
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Notify
    }

    fn nominal_payload(&self) -> Option<Value> {
        Some(recorded_ok())
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: UnknownQuestionArgs =
            serde_json::from_value(args).map_err(|e| format!("record_unknown_question: {e}"))?;

        let delivery = self
            .notifier
            .notify(&format!("Recording {}", args.question))
            .await;
        tracing::info!("Unknown question recorded: {}", preview(&args.question, 100));

        Ok(ToolOutput::with_delivery(recorded_ok(), delivery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::RecordingNotifier;

    #[tokio::test]
    async fn test_user_details_message_uses_defaults() {
        let notifier = RecordingNotifier::new();
        let tool = RecordUserDetailsTool::new(Arc::new(notifier.clone()));

        let out = tool.execute(json!({"email": "jane@example.com"})).await.unwrap();

        assert_eq!(out.payload, json!({"recorded": "ok"}));
        assert_eq!(
            notifier.sent(),
            vec!["Recording Name not provided with email jane@example.com and notes not provided"]
        );
    }

    #[tokio::test]
    async fn test_user_details_failure_still_recorded_ok() {
        let notifier = RecordingNotifier::failing("Timeout");
        let tool = RecordUserDetailsTool::new(Arc::new(notifier));

        let out = tool
            .execute(json!({"email": "jane@example.com", "name": "Jane", "notes": "hiring"}))
            .await
            .unwrap();

        assert_eq!(out.payload, json!({"recorded": "ok"}));
        assert_eq!(out.delivery.unwrap().error_detail(), Some("Timeout"));
    }

    #[tokio::test]
    async fn test_unknown_question_pushes_question() {
        let notifier = RecordingNotifier::new();
        let tool = RecordUnknownQuestionTool::new(Arc::new(notifier.clone()));

        let out = tool
            .execute(json!({"question": "What is your favourite colour?"}))
            .await
            .unwrap();

        assert_eq!(out.payload, json!({"recorded": "ok"}));
        assert_eq!(notifier.sent(), vec!["Recording What is your favourite colour?"]);
    }
}
