//! 核心层：错误、轮次状态、会话关闭存储、优雅关闭

pub mod error;
pub mod session_store;
pub mod shutdown;
pub mod state;

pub use error::AgentError;
pub use session_store::{SessionGuard, SessionStateStore, SessionStatus};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{TurnOutcome, TurnPhase};
