//! LLM 层：模型客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockModelClient, RecordedRequest};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{FinishReason, LlmError, ModelClient, ModelResponse};
