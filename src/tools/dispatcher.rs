//! 工具分发器
//!
//! 持有 ToolRegistry 与单次调用超时。dispatch 按模型给出的顺序逐个执行工具调用（不并发），
//! 每个请求恰好产生一个结果：未知工具 -> `{}`，参数非法 / 执行失败 / 超时 -> `{"error": ...}`，
//! 单个失败不影响同批其余调用。每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::time::timeout;

use crate::chat::{Message, ToolCallRequest};
use crate::tools::schema::{parse_arguments, validate_arguments};
use crate::tools::{SideEffect, ToolDescriptor, ToolRegistry};

/// 一次工具调用的结果（role = tool）
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocationResult {
    pub call_id: String,
    pub tool_name: String,
    pub payload: Value,
}

impl ToolInvocationResult {
    /// 序列化后的结果文本（写回对话上下文）
    pub fn content(&self) -> String {
        self.payload.to_string()
    }

    pub fn to_message(&self) -> Message {
        Message::tool(self.call_id.clone(), self.content())
    }
}

/// 一批工具调用的结果
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// 与请求一一对应、顺序一致
    pub results: Vec<ToolInvocationResult>,
    /// 本批是否有任意调用请求关闭会话
    pub termination_requested: bool,
}

/// 工具分发器
pub struct ToolDispatcher {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 发给模型的工具目录
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// 顺序执行一批工具调用
    pub async fn dispatch(&self, calls: &[ToolCallRequest]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for call in calls {
            let (payload, terminate) = self.invoke(call).await;
            outcome.termination_requested |= terminate;
            outcome.results.push(ToolInvocationResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                payload,
            });
        }
        outcome
    }

    /// 执行单个调用，返回 (payload, 是否请求关闭会话)；只有关闭类工具成功执行才算请求关闭
    async fn invoke(&self, call: &ToolCallRequest) -> (Value, bool) {
        let start = Instant::now();
        tracing::info!(tool = %call.name, call_id = %call.id, "Tool called");

        let Some(entry) = self.registry.lookup(&call.name) else {
            tracing::warn!(tool = %call.name, "Model requested unknown tool, substituting empty result");
            audit(&call.name, "unknown_tool", start, &call.arguments);
            return (json!({}), false);
        };

        let args = match parse_arguments(&call.arguments)
            .and_then(|args| validate_arguments(&entry.descriptor.parameters, &args).map(|_| args))
        {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                audit(&call.name, "invalid_arguments", start, &call.arguments);
                return (json!({"error": e}), false);
            }
        };

        let result = timeout(self.timeout, entry.handler().execute(args)).await;

        let (payload, outcome, ran) = match result {
            Ok(Ok(output)) => match output.delivery.as_ref().and_then(|d| d.error_detail()) {
                Some(detail) if entry.surface_delivery_errors => {
                    tracing::warn!(tool = %call.name, error = %detail, "Delivery failed, reporting to model");
                    (json!({"status": "error", "error": detail}), "delivery_error", true)
                }
                Some(detail) => {
                    tracing::warn!(tool = %call.name, error = %detail, "Delivery failed, hidden from model");
                    (output.payload, "ok_delivery_hidden", true)
                }
                None => (output.payload, "ok", true),
            },
            Ok(Err(e)) => {
                tracing::error!(tool = %call.name, error = %e, "Tool execution failed");
                (json!({"error": e}), "error", false)
            }
            Err(_) => match entry.handler().nominal_payload() {
                // 投递超时与投递失败同等对待：对隐藏投递错误的工具，模型仍只看到正常结果
                Some(nominal) if !entry.surface_delivery_errors => {
                    tracing::warn!(tool = %call.name, timeout_secs = self.timeout.as_secs(), "Tool timed out, hidden from model");
                    (nominal, "timeout_hidden", false)
                }
                _ => {
                    tracing::error!(tool = %call.name, timeout_secs = self.timeout.as_secs(), "Tool timed out");
                    (json!({"error": "Tool timed out"}), "timeout", false)
                }
            },
        };
        audit(&call.name, outcome, start, &call.arguments);

        (payload, ran && entry.side_effect == SideEffect::Terminate)
    }
}

fn audit(tool: &str, outcome: &str, start: Instant, raw_args: &str) {
    let audit = json!({
        "event": "tool_audit",
        "tool": tool,
        "ok": outcome.starts_with("ok"),
        "outcome": outcome,
        "duration_ms": start.elapsed().as_millis() as u64,
        "args_preview": args_preview(raw_args),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

fn args_preview(raw: &str) -> String {
    if raw.chars().count() > 200 {
        format!("{}...", raw.chars().take(200).collect::<String>())
    } else {
        raw.to_string()
    }
}
