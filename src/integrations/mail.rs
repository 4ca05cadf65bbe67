//! 带附件的邮件发送
//!
//! 通过 SendGrid v3 HTTP 接口（`POST /v3/mail/send`）发送 HTML 邮件，附件以 base64 内联。
//! 凭据缺失时 `is_configured()` 返回 false，由调用方在发送前拦截。

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::integrations::delivery::{classify_reqwest_error, DeliveryOutcome};

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// 邮件附件
#[derive(Clone, Debug)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 一封待发送的邮件
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Attachment,
}

/// 邮件发送能力
#[async_trait]
pub trait MailSink: Send + Sync {
    /// 发件凭据是否已配置
    fn is_configured(&self) -> bool;

    async fn send_with_attachment(&self, email: &OutgoingEmail) -> DeliveryOutcome;
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct AttachmentBody<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
    disposition: &'a str,
}

#[derive(Serialize)]
struct SendMailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    attachments: Vec<AttachmentBody<'a>>,
}

/// SendGrid 发件客户端
pub struct SendGridMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
    from_email: String,
    from_name: Option<String>,
}

impl SendGridMailer {
    pub fn new(
        api_key: Option<SecretString>,
        from_email: impl Into<String>,
        from_name: Option<String>,
        api_url: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.unwrap_or(SENDGRID_API_URL).to_string(),
            api_key,
            from_email: from_email.into(),
            from_name,
        })
    }

    fn request_body<'a>(&'a self, email: &'a OutgoingEmail) -> SendMailRequest<'a> {
        SendMailRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.from_email,
                name: self.from_name.as_deref(),
            },
            subject: &email.subject,
            content: vec![Content {
                content_type: "text/html",
                value: &email.html_body,
            }],
            attachments: vec![AttachmentBody {
                content: base64::engine::general_purpose::STANDARD
                    .encode(&email.attachment.bytes),
                filename: &email.attachment.filename,
                content_type: &email.attachment.content_type,
                disposition: "attachment",
            }],
        }
    }
}

#[async_trait]
impl MailSink for SendGridMailer {
    fn is_configured(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|k| !k.expose_secret().trim().is_empty())
            .unwrap_or(false)
            && !self.from_email.trim().is_empty()
    }

    async fn send_with_attachment(&self, email: &OutgoingEmail) -> DeliveryOutcome {
        let Some(api_key) = self.api_key.as_ref() else {
            return DeliveryOutcome::failure("Email service not configured");
        };

        let result = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key.expose_secret())
            .json(&self.request_body(email))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                let code = resp.status().as_u16();
                tracing::info!(to = %email.to, code, "CV email sent");
                DeliveryOutcome::success(code)
            }
            Ok(resp) => {
                let code = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(to = %email.to, code, body = %body, "Mail API rejected request");
                DeliveryOutcome {
                    code: Some(code),
                    ..DeliveryOutcome::failure(format!("HTTP {code}"))
                }
            }
            Err(e) => {
                let detail = classify_reqwest_error(&e);
                tracing::error!(to = %email.to, error = %e, "Mail request failed");
                DeliveryOutcome::failure(detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> OutgoingEmail {
        OutgoingEmail {
            to: "visitor@example.com".to_string(),
            subject: "My CV".to_string(),
            html_body: "<p>Hi</p>".to_string(),
            attachment: Attachment {
                filename: "CV.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.4".to_vec(),
            },
        }
    }

    #[test]
    fn test_is_configured_requires_key() {
        let mailer = SendGridMailer::new(
            None,
            "me@example.com",
            None,
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!mailer.is_configured());

        let mailer = SendGridMailer::new(
            Some(SecretString::from("SG.key".to_string())),
            "me@example.com",
            Some("Me".to_string()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(mailer.is_configured());
    }

    #[test]
    fn test_request_body_shape() {
        let mailer = SendGridMailer::new(
            Some(SecretString::from("SG.key".to_string())),
            "me@example.com",
            Some("Me".to_string()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let email = sample_email();
        let body = serde_json::to_value(mailer.request_body(&email)).unwrap();
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "visitor@example.com");
        assert_eq!(body["from"]["name"], "Me");
        assert_eq!(body["content"][0]["type"], "text/html");
        assert_eq!(body["attachments"][0]["filename"], "CV.pdf");
        assert_eq!(body["attachments"][0]["content"], "JVBERi0xLjQ=");
    }

    #[tokio::test]
    async fn test_send_without_key_fails_locally() {
        let mailer =
            SendGridMailer::new(None, "me@example.com", None, None, Duration::from_secs(5))
                .unwrap();
        let outcome = mailer.send_with_attachment(&sample_email()).await;
        assert_eq!(outcome.error_detail(), Some("Email service not configured"));
    }
}
