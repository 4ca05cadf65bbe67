//! 外发投递结果
//!
//! 推送与邮件的所有失败（超时、HTTP 错误、未配置）都在 sink 内部转为 DeliveryOutcome，不以 Err 返回。

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Error,
}

/// 一次投递的结果：`{"status":"success","code":200}` 或 `{"status":"error","error":"Timeout"}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(code: u16) -> Self {
        Self {
            status: DeliveryStatus::Success,
            code: Some(code),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Error,
            code: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }

    /// 失败描述；成功时为 None
    pub fn error_detail(&self) -> Option<&str> {
        match self.status {
            DeliveryStatus::Success => None,
            DeliveryStatus::Error => Some(self.error.as_deref().unwrap_or("unknown error")),
        }
    }
}

/// 把 reqwest 错误归类为投递失败描述：超时 -> "Timeout"，HTTP 状态 -> "HTTP 4xx"，其余原样
pub fn classify_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Timeout".to_string()
    } else if let Some(status) = e.status() {
        format!("HTTP {}", status.as_u16())
    } else {
        e.to_string()
    }
}

/// 日志里只保留前 n 个字符
pub fn preview(text: &str, n: usize) -> String {
    if text.chars().count() > n {
        format!("{}...", text.chars().take(n).collect::<String>())
    } else {
        text.to_string()
    }
}
