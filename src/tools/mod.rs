pub mod contact;
pub mod cv_mail;
pub mod dispatcher;
pub mod registry;
pub mod schema;
pub mod stop;

pub use contact::{RecordUnknownQuestionTool, RecordUserDetailsTool};
pub use cv_mail::SendEmailWithCvTool;
pub use dispatcher::{DispatchOutcome, ToolDispatcher, ToolInvocationResult};
pub use registry::{RegisteredTool, SideEffect, Tool, ToolDescriptor, ToolOutput, ToolRegistry};
pub use schema::validate_arguments;
pub use stop::StopConversationTool;
