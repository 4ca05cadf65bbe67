//! send_email_with_cv：把简历 PDF 作为附件发给访客
//!
//! 发送前依次校验：收件人含 "@"、简历文件可读、发件凭据已配置；任一失败直接返回
//! `{"status":"error","error":...}`，不会触发发送。投递失败对模型可见（surface_delivery_errors = true），
//! 以便模型如实告诉访客。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::integrations::{Attachment, MailSink, OutgoingEmail};
use crate::tools::{SideEffect, Tool, ToolOutput};

fn error_payload(reason: &str) -> Value {
    json!({"status": "error", "error": reason})
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

/// 邮件正文模板
pub fn render_cv_email(personalized_message: &str, sender_name: &str) -> String {
    format!(
        "<html><body>\
         <p>{}</p>\
         <p>You will find my CV attached to this email.</p>\
         <p>Best regards,<br>{}</p>\
         </body></html>",
        escape_html(personalized_message),
        escape_html(sender_name)
    )
}

#[derive(Deserialize)]
struct CvMailArgs {
    recipient_email: String,
    subject: String,
    personalized_message: String,
}

/// 简历发送工具
pub struct SendEmailWithCvTool {
    mailer: Arc<dyn MailSink>,
    cv_path: PathBuf,
    cv_filename: String,
    sender_name: String,
}

impl SendEmailWithCvTool {
    pub fn new(
        mailer: Arc<dyn MailSink>,
        cv_path: impl Into<PathBuf>,
        cv_filename: impl Into<String>,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            cv_path: cv_path.into(),
            cv_filename: cv_filename.into(),
            sender_name: sender_name.into(),
        }
    }
}

#[async_trait]
impl Tool for SendEmailWithCvTool {
    fn name(&self) -> &str {
        "send_email_with_cv"
    }

    fn description(&self) -> &str {
        "Use this tool to send the CV by email when the user asks for it and provided an email address"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "recipient_email": {
                    "type": "string",
                    "description": "The email address to send the CV to"
                },
                "subject": {
                    "type": "string",
                    "description": "The subject line of the email"
                },
                "personalized_message": {
                    "type": "string",
                    "description": "A short personalized message for the recipient, written in character"
                }
            },
            "required": ["recipient_email", "subject", "personalized_message"],
            "additionalProperties": false
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mail
    }

    fn surface_delivery_errors(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: CvMailArgs =
            serde_json::from_value(args).map_err(|e| format!("send_email_with_cv: {e}"))?;
        let recipient = args.recipient_email.trim();

        if !recipient.contains('@') {
            tracing::warn!(recipient = %recipient, "Rejected CV request: invalid email");
            return Ok(ToolOutput::new(error_payload("Invalid email format")));
        }

        let bytes = match tokio::fs::read(&self.cv_path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(path = %self.cv_path.display(), error = %e, "CV file not readable");
                return Ok(ToolOutput::new(error_payload("CV file not found")));
            }
        };

        if !self.mailer.is_configured() {
            tracing::error!("CV requested but mail credentials are not configured");
            return Ok(ToolOutput::new(error_payload("Email service not configured")));
        }

        let email = OutgoingEmail {
            to: recipient.to_string(),
            subject: args.subject,
            html_body: render_cv_email(&args.personalized_message, &self.sender_name),
            attachment: Attachment {
                filename: self.cv_filename.clone(),
                content_type: "application/pdf".to_string(),
                bytes,
            },
        };

        let delivery = self.mailer.send_with_attachment(&email).await;

        let mut payload = json!({
            "status": "success",
            "message": format!("CV sent to {recipient}"),
        });
        if let Some(code) = delivery.code {
            payload["status_code"] = json!(code);
        }
        Ok(ToolOutput::with_delivery(payload, delivery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::RecordingMailer;
    use std::io::Write;

    fn cv_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.4 fake cv").unwrap();
        f
    }

    fn args(recipient: &str) -> Value {
        json!({
            "recipient_email": recipient,
            "subject": "CV as requested",
            "personalized_message": "Great talking to you!"
        })
    }

    #[tokio::test]
    async fn test_invalid_email_never_sends() {
        let mailer = RecordingMailer::new();
        let cv = cv_file();
        let tool = SendEmailWithCvTool::new(Arc::new(mailer.clone()), cv.path(), "CV.pdf", "Me");

        let out = tool.execute(args("not-an-email")).await.unwrap();

        assert_eq!(out.payload, json!({"status": "error", "error": "Invalid email format"}));
        assert!(out.delivery.is_none());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_cv_file() {
        let mailer = RecordingMailer::new();
        let tool = SendEmailWithCvTool::new(
            Arc::new(mailer.clone()),
            "/definitely/not/here/cv.pdf",
            "CV.pdf",
            "Me",
        );

        let out = tool.execute(args("a@b.com")).await.unwrap();

        assert_eq!(out.payload["error"], "CV file not found");
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_mailer() {
        let mailer = RecordingMailer::unconfigured();
        let cv = cv_file();
        let tool = SendEmailWithCvTool::new(Arc::new(mailer.clone()), cv.path(), "CV.pdf", "Me");

        let out = tool.execute(args("a@b.com")).await.unwrap();

        assert_eq!(out.payload["error"], "Email service not configured");
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_success_sends_once_with_attachment() {
        let mailer = RecordingMailer::new();
        let cv = cv_file();
        let tool = SendEmailWithCvTool::new(Arc::new(mailer.clone()), cv.path(), "CV.pdf", "Me");

        let out = tool.execute(args("recruiter@corp.com")).await.unwrap();

        assert_eq!(out.payload["status"], "success");
        assert_eq!(out.payload["status_code"], 202);
        assert_eq!(out.payload["message"], "CV sent to recruiter@corp.com");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "recruiter@corp.com");
        assert_eq!(sent[0].subject, "CV as requested");
        assert!(sent[0].html_body.contains("Great talking to you!"));
        assert_eq!(sent[0].attachment.bytes, b"%PDF-1.4 fake cv");
        assert_eq!(sent[0].attachment.filename, "CV.pdf");
    }

    #[test]
    fn test_template_escapes_html() {
        let html = render_cv_email("<script>\nhi", "A & B");
        assert!(html.contains("&lt;script&gt;<br>hi"));
        assert!(html.contains("A &amp; B"));
    }
}
