//! 对话层：消息类型、单轮上下文、主循环

pub mod context;
pub mod loop_;
pub mod message;

pub use context::TurnContext;
pub use loop_::{ChatSettings, ConversationLoop};
pub use message::{HistoryEntry, Message, Role, ToolCallRequest};
