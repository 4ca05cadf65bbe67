//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! 注册时同时固定工具的副作用分类与投递失败策略（surface_delivery_errors），ToolDispatcher 据此决定
//! 投递失败是否要告诉模型、哪个工具会关闭会话。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::integrations::DeliveryOutcome;

/// 工具的外部副作用分类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    None,
    /// 推送通知
    Notify,
    /// 发送邮件
    Mail,
    /// 关闭当前会话
    Terminate,
}

/// 提供给模型的工具描述（名称、说明、参数 JSON Schema）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具执行结果：返回给模型的 payload，以及（若有外发动作）投递结果
#[derive(Clone, Debug)]
pub struct ToolOutput {
    pub payload: Value,
    pub delivery: Option<DeliveryOutcome>,
}

impl ToolOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            delivery: None,
        }
    }

    pub fn with_delivery(payload: Value, delivery: DeliveryOutcome) -> Self {
        Self {
            payload,
            delivery: Some(delivery),
        }
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 已通过 schema 校验）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（function calling 中的 name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解何时调用）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数且不允许额外字段
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": [],
            "additionalProperties": false
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::None
    }

    /// 投递失败时是否把错误返回给模型；false 时模型只看到工具的正常 payload
    fn surface_delivery_errors(&self) -> bool {
        false
    }

    /// 超时时的正常 payload：仅对隐藏投递错误的工具生效，返回 None 时按超时错误处理
    fn nominal_payload(&self) -> Option<Value> {
        None
    }

    /// 执行工具；Err 表示工具自身无法完成（会以 {"error": ...} 返回给模型）
    async fn execute(&self, args: Value) -> Result<ToolOutput, String>;
}

/// 注册表中的一项
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub side_effect: SideEffect,
    pub surface_delivery_errors: bool,
    handler: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn handler(&self) -> &Arc<dyn Tool> {
        &self.handler
    }
}

/// 工具注册表：保留注册顺序（工具目录按此顺序发给模型），名称唯一
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let entry = RegisteredTool {
            descriptor: ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            },
            side_effect: tool.side_effect(),
            surface_delivery_errors: tool.surface_delivery_errors(),
            handler: Arc::new(tool),
        };
        let name = entry.descriptor.name.clone();
        match self.index.get(&name) {
            Some(&i) => {
                tracing::warn!(tool = %name, "Replacing previously registered tool");
                self.tools[i] = entry;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(entry);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// 覆盖某个工具的投递失败策略（来自配置）；工具不存在时返回 false
    pub fn set_surface_delivery_errors(&mut self, name: &str, surface: bool) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.tools[i].surface_delivery_errors = surface;
                true
            }
            None => false,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.descriptor.name.clone()).collect()
    }

    /// 工具目录（注册顺序）
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, SideEffect);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn side_effect(&self) -> SideEffect {
            self.1
        }

        async fn execute(&self, _args: Value) -> Result<ToolOutput, String> {
            Ok(ToolOutput::new(serde_json::json!({"name": self.0})))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("a", SideEffect::None));
        registry.register(Named("b", SideEffect::Terminate));

        assert_eq!(registry.tool_names(), vec!["a", "b"]);
        assert_eq!(registry.lookup("b").unwrap().side_effect, SideEffect::Terminate);
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("a", SideEffect::None));
        registry.register(Named("b", SideEffect::None));
        registry.register(Named("a", SideEffect::Notify));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tool_names(), vec!["a", "b"]);
        assert_eq!(registry.lookup("a").unwrap().side_effect, SideEffect::Notify);
    }

    #[test]
    fn test_override_delivery_policy() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("a", SideEffect::Notify));
        assert!(!registry.lookup("a").unwrap().surface_delivery_errors);
        assert!(registry.set_surface_delivery_errors("a", true));
        assert!(registry.lookup("a").unwrap().surface_delivery_errors);
        assert!(!registry.set_surface_delivery_errors("nope", true));
    }
}
