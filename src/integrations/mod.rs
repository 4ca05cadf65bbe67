//! 外部集成：Pushover 推送、SendGrid 邮件（均为黑盒能力，只暴露投递结果）

pub mod delivery;
pub mod mail;
pub mod mock;
pub mod pushover;

pub use delivery::{DeliveryOutcome, DeliveryStatus};
pub use mail::{Attachment, MailSink, OutgoingEmail, SendGridMailer};
pub use mock::{RecordingMailer, RecordingNotifier};
pub use pushover::{NotificationSink, PushoverNotifier, UnconfiguredNotifier};
