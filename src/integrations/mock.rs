//! 记录型 Mock sink（测试用）
//!
//! 记录每次投递的内容，并可配置为始终失败，用于验证工具层对投递失败的处理。

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::integrations::{DeliveryOutcome, MailSink, NotificationSink, OutgoingEmail};

/// 记录推送文本的通知 sink
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次投递都返回给定失败
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            failure: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, text: &str) -> DeliveryOutcome {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(text.to_string());
        match &self.failure {
            Some(err) => DeliveryOutcome::failure(err.clone()),
            None => DeliveryOutcome::success(200),
        }
    }
}

/// 记录邮件的 mail sink
#[derive(Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    configured: bool,
    failure: Option<String>,
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            configured: true,
            failure: None,
        }
    }
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟未配置凭据
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::default()
        }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            failure: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MailSink for RecordingMailer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_with_attachment(&self, email: &OutgoingEmail) -> DeliveryOutcome {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(email.clone());
        match &self.failure {
            Some(err) => DeliveryOutcome::failure(err.clone()),
            None => DeliveryOutcome::success(202),
        }
    }
}
