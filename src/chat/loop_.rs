//! 对话主循环
//!
//! AwaitingModel -> (模型请求工具) -> HandlingTools -> AwaitingModel ... -> Done。
//! 进入时持有会话守卫：已关闭的会话直接返回固定提示，不调用模型；本轮任意工具轮次请求关闭时，
//! 在返回模型最终回复前写入关闭状态。工具轮次有上限，超出视为整轮失败。

use std::sync::Arc;

use crate::chat::{HistoryEntry, ToolCallRequest, TurnContext};
use crate::core::{AgentError, SessionStateStore, TurnOutcome, TurnPhase};
use crate::integrations::delivery::preview;
use crate::llm::{FinishReason, ModelClient, ModelResponse};
use crate::persona::{build_system_prompt, PersonaKnowledgeBase};
use crate::tools::ToolDispatcher;

/// 默认工具轮次上限
pub const DEFAULT_MAX_ROUNDS: usize = 8;
pub const DEFAULT_CLOSED_MESSAGE: &str =
    "This conversation has been closed. Please leave the website.";
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Sorry, something went wrong on my side. Please try again in a moment.";

/// 对话循环配置
#[derive(Clone, Debug)]
pub struct ChatSettings {
    /// 单轮最多执行的工具轮次
    pub max_rounds: usize,
    /// 会话已关闭时的固定回复
    pub closed_message: String,
    /// 整轮失败时给访客的通用回复
    pub failure_message: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            closed_message: DEFAULT_CLOSED_MESSAGE.to_string(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// 循环内部状态（带数据）；对外投影为 TurnPhase
enum Step {
    AwaitingModel,
    HandlingTools {
        content: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    Done(String),
}

impl Step {
    fn phase(&self) -> TurnPhase {
        match self {
            Step::AwaitingModel => TurnPhase::AwaitingModel,
            Step::HandlingTools { .. } => TurnPhase::HandlingTools,
            Step::Done(_) => TurnPhase::Done,
        }
    }
}

/// 把一次模型响应归类为「直接回复」或「工具请求」
fn classify(response: ModelResponse) -> Result<Step, AgentError> {
    match response.finish_reason {
        FinishReason::ToolCalls if response.tool_calls.is_empty() => Err(
            AgentError::ProtocolError("finish_reason=tool_calls without any tool call".to_string()),
        ),
        FinishReason::ToolCalls => Ok(Step::HandlingTools {
            content: response.content,
            calls: response.tool_calls,
        }),
        reason => match response.content {
            Some(text) => Ok(Step::Done(text)),
            None => Err(AgentError::ProtocolError(format!(
                "no answer and no tool calls (finish_reason={reason:?})"
            ))),
        },
    }
}

/// 一轮内的计数；失败时也随 TurnOutcome 返回
#[derive(Clone, Copy, Debug, Default)]
struct TurnCounters {
    tool_rounds: usize,
    model_calls: usize,
}

/// 对话主循环：多会话共享一个实例
pub struct ConversationLoop {
    model: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    sessions: SessionStateStore,
    persona: Arc<PersonaKnowledgeBase>,
    settings: ChatSettings,
}

impl ConversationLoop {
    pub fn new(
        model: Arc<dyn ModelClient>,
        dispatcher: ToolDispatcher,
        sessions: SessionStateStore,
        persona: Arc<PersonaKnowledgeBase>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            model,
            dispatcher,
            sessions,
            persona,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStateStore {
        &self.sessions
    }

    pub fn persona(&self) -> &PersonaKnowledgeBase {
        &self.persona
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.dispatcher.tool_names()
    }

    /// UI 入口：总是返回给访客的文本，可恢复的错误不会抛给调用方
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
        history: Vec<HistoryEntry>,
    ) -> String {
        self.handle_turn_detailed(session_id, message, history)
            .await
            .reply
    }

    /// 同 handle_turn，但返回完整的 TurnOutcome（HTTP 层需要 closed 标记）
    pub async fn handle_turn_detailed(
        &self,
        session_id: &str,
        message: &str,
        history: Vec<HistoryEntry>,
    ) -> TurnOutcome {
        let mut counters = TurnCounters::default();
        match self.drive(session_id, message, history, &mut counters).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    session_id,
                    error = %e,
                    tool_rounds = counters.tool_rounds,
                    model_calls = counters.model_calls,
                    "Turn failed"
                );
                TurnOutcome {
                    reply: self.settings.failure_message.clone(),
                    closed: false,
                    tool_rounds: counters.tool_rounds,
                    model_calls: counters.model_calls,
                }
            }
        }
    }

    /// 跑完整一轮；模型协议错误与轮次超限以 Err 返回，此时不会关闭会话
    pub async fn run_turn(
        &self,
        session_id: &str,
        message: &str,
        history: Vec<HistoryEntry>,
    ) -> Result<TurnOutcome, AgentError> {
        self.drive(session_id, message, history, &mut TurnCounters::default())
            .await
    }

    async fn drive(
        &self,
        session_id: &str,
        message: &str,
        history: Vec<HistoryEntry>,
        counters: &mut TurnCounters,
    ) -> Result<TurnOutcome, AgentError> {
        tracing::info!("Received message in session {}: {}", session_id, preview(message, 50));

        let mut guard = self.sessions.lock(session_id).await;
        if guard.is_closed() {
            tracing::info!(session_id, "Rejected message on closed session");
            return Ok(TurnOutcome::closed_session(self.settings.closed_message.clone()));
        }

        let catalog = self.dispatcher.catalog();
        let mut context = TurnContext::new(build_system_prompt(&self.persona), history, message);
        let mut step = Step::AwaitingModel;
        let mut stop_requested = false;

        let reply = loop {
            tracing::debug!(session_id, phase = ?step.phase(), tool_rounds = counters.tool_rounds, "Turn step");
            step = match step {
                Step::AwaitingModel => {
                    counters.model_calls += 1;
                    let response = self.model.complete(context.messages(), &catalog).await?;
                    let next = classify(response)?;
                    if matches!(next, Step::HandlingTools { .. })
                        && counters.tool_rounds >= self.settings.max_rounds
                    {
                        return Err(AgentError::MaxRoundsExceeded(self.settings.max_rounds));
                    }
                    next
                }
                Step::HandlingTools { content, calls } => {
                    let outcome = self.dispatcher.dispatch(&calls).await;
                    counters.tool_rounds += 1;
                    stop_requested |= outcome.termination_requested;
                    context.push_tool_round(content, calls, &outcome.results);
                    Step::AwaitingModel
                }
                Step::Done(text) => break text,
            };
        };

        if stop_requested {
            guard.close();
        }

        let (prompt_tokens, completion_tokens, _) = self.model.token_usage();
        tracing::info!(
            session_id,
            tool_rounds = counters.tool_rounds,
            model_calls = counters.model_calls,
            prompt_tokens,
            completion_tokens,
            closed = guard.is_closed(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply,
            closed: guard.is_closed(),
            tool_rounds: counters.tool_rounds,
            model_calls: counters.model_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crate::integrations::RecordingNotifier;
    use crate::llm::{LlmError, MockModelClient};
    use crate::tools::{RecordUnknownQuestionTool, StopConversationTool, ToolRegistry};

    fn conversation(model: MockModelClient, max_rounds: usize) -> ConversationLoop {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut registry = ToolRegistry::new();
        registry.register(RecordUnknownQuestionTool::new(notifier));
        registry.register(StopConversationTool);
        ConversationLoop::new(
            Arc::new(model),
            ToolDispatcher::new(registry, 5),
            SessionStateStore::new(),
            Arc::new(PersonaKnowledgeBase::new("Ada", "summary", "profile")),
            ChatSettings {
                max_rounds,
                ..ChatSettings::default()
            },
        )
    }

    fn tool_round(id: &str, name: &str, args: &str) -> ModelResponse {
        ModelResponse::tool_calls(vec![ToolCallRequest::new(id, name, args)])
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(ModelResponse::text("hi")).unwrap(),
            Step::Done(t) if t == "hi"
        ));
        assert!(matches!(
            classify(ModelResponse::tool_calls(Vec::new())),
            Err(AgentError::ProtocolError(_))
        ));
        let empty = ModelResponse {
            finish_reason: FinishReason::Stop,
            content: None,
            tool_calls: Vec::new(),
        };
        assert!(matches!(classify(empty), Err(AgentError::ProtocolError(_))));
        let truncated = ModelResponse {
            finish_reason: FinishReason::Length,
            content: Some("partial".to_string()),
            tool_calls: Vec::new(),
        };
        assert!(matches!(classify(truncated).unwrap(), Step::Done(_)));
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let model = MockModelClient::new(vec![ModelResponse::text("I build compilers.")]);
        let chat = conversation(model.clone(), 8);

        let reply = chat.handle_turn("s1", "What do you do?", Vec::new()).await;

        assert_eq!(reply, "I build compilers.");
        let req = &model.requests()[0];
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages.last().unwrap().content, "What do you do?");
        assert_eq!(req.tool_names, vec!["record_unknown_question", "stop_conversation"]);
    }

    #[tokio::test]
    async fn test_three_rounds_converge() {
        let model = MockModelClient::new(vec![
            tool_round("c1", "record_unknown_question", r#"{"question":"a"}"#),
            tool_round("c2", "record_unknown_question", r#"{"question":"b"}"#),
            ModelResponse::text("Final answer"),
        ]);
        let chat = conversation(model.clone(), 8);

        let outcome = chat.run_turn("s1", "hi", Vec::new()).await.unwrap();

        assert_eq!(outcome.reply, "Final answer");
        assert_eq!(outcome.tool_rounds, 2);
        assert_eq!(outcome.model_calls, 3);
        // 第三次请求里应包含前两轮的 assistant 调用与 tool 结果
        let last = &model.requests()[2].messages;
        let tail: Vec<Role> = last.iter().rev().take(4).map(|m| m.role).collect();
        assert_eq!(tail, vec![Role::Tool, Role::Assistant, Role::Tool, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_round_limit_is_turn_error() {
        let model = MockModelClient::always(tool_round(
            "c",
            "record_unknown_question",
            r#"{"question":"loop"}"#,
        ));
        let chat = conversation(model.clone(), 3);

        let err = chat.run_turn("s1", "hi", Vec::new()).await.unwrap_err();

        assert!(matches!(err, AgentError::MaxRoundsExceeded(3)));
        assert_eq!(model.call_count(), 4);
        assert!(!chat.sessions().is_closed("s1").await);
    }

    #[tokio::test]
    async fn test_stop_closes_session_and_returns_model_text() {
        let model = MockModelClient::new(vec![
            tool_round("c1", "stop_conversation", "{}"),
            ModelResponse::text("Please leave the website."),
        ]);
        let chat = conversation(model.clone(), 8);

        let outcome = chat.run_turn("s1", "you are useless", Vec::new()).await.unwrap();
        assert_eq!(outcome.reply, "Please leave the website.");
        assert!(outcome.closed);

        let reply = chat.handle_turn("s1", "hello again", Vec::new()).await;
        assert_eq!(reply, DEFAULT_CLOSED_MESSAGE);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_returns_generic_message() {
        let model = MockModelClient::new(vec![tool_round("c1", "stop_conversation", "{}")])
            .then_fail(LlmError::Request("connection reset".to_string()));
        let chat = conversation(model, 8);

        let outcome = chat.handle_turn_detailed("s1", "bye", Vec::new()).await;

        assert_eq!(outcome.reply, DEFAULT_FAILURE_MESSAGE);
        assert!(!outcome.closed);
        assert_eq!(outcome.model_calls, 2);
        assert_eq!(outcome.tool_rounds, 1);
        // 本轮失败，即使请求过 stop 也不关闭
        assert!(!chat.sessions().is_closed("s1").await);
    }
}
