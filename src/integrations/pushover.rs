//! Pushover 推送通知
//!
//! 访客留下联系方式或问到答不上的问题时，推送到本人手机。请求有超时上限（默认 10 秒），
//! 任何失败都转为 DeliveryOutcome 并记录日志，调用方不会因推送失败而中断。

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::integrations::delivery::{classify_reqwest_error, preview, DeliveryOutcome};

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// 推送通知能力：给定文本，返回投递结果
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, text: &str) -> DeliveryOutcome;
}

/// Pushover 客户端
pub struct PushoverNotifier {
    client: reqwest::Client,
    api_url: String,
    token: SecretString,
    user: SecretString,
}

impl PushoverNotifier {
    pub fn new(
        token: SecretString,
        user: SecretString,
        api_url: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.unwrap_or(PUSHOVER_API_URL).to_string(),
            token,
            user,
        })
    }
}

#[async_trait]
impl NotificationSink for PushoverNotifier {
    async fn notify(&self, text: &str) -> DeliveryOutcome {
        let form = [
            ("token", self.token.expose_secret()),
            ("user", self.user.expose_secret()),
            ("message", text),
        ];

        let result = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(resp) => {
                tracing::info!("Push notification sent successfully: {}", preview(text, 50));
                DeliveryOutcome::success(resp.status().as_u16())
            }
            Err(e) => {
                let detail = classify_reqwest_error(&e);
                tracing::error!(error = %e, "Push notification failed ({}): {}", detail, preview(text, 50));
                DeliveryOutcome::failure(detail)
            }
        }
    }
}

/// 未配置 Pushover 凭据时使用：每次都返回失败，只留日志
#[derive(Debug, Default)]
pub struct UnconfiguredNotifier;

#[async_trait]
impl NotificationSink for UnconfiguredNotifier {
    async fn notify(&self, text: &str) -> DeliveryOutcome {
        tracing::warn!("Notification dropped (not configured): {}", preview(text, 50));
        DeliveryOutcome::failure("Notification service not configured")
    }
}
