//! Persona Echo - 以个人身份接待网站访客的对话智能体
//!
//! 模块划分：
//! - **agent**: 按配置组装对话循环（人设、模型、投递端、工具）
//! - **chat**: 消息类型、单轮上下文、对话主循环（状态机）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、轮次状态、会话关闭状态存储、优雅退出
//! - **integrations**: 通知（Pushover）与邮件（SendGrid）投递
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **persona**: 个人资料加载与 system prompt
//! - **server**: HTTP 接口（axum）
//! - **tools**: 工具注册表、参数校验、分发器与四个内置工具

pub mod agent;
pub mod chat;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod observability;
pub mod persona;
pub mod server;
pub mod tools;

pub use chat::ConversationLoop;
pub use core::{AgentError, SessionStateStore};
