//! 人设层：个人资料加载与 system prompt

pub mod loader;
pub mod prompt;

pub use loader::{PersonaError, PersonaKnowledgeBase};
pub use prompt::build_system_prompt;
