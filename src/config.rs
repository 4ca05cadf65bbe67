//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PERSONA__*` 覆盖（双下划线表示嵌套，如 `PERSONA__CHAT__MAX_ROUNDS=4`）。
//! 凭据若未在配置中给出，再回退到常用环境变量（OPENAI_API_KEY、PUSHOVER_TOKEN 等）。

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::chat::loop_::{DEFAULT_CLOSED_MESSAGE, DEFAULT_FAILURE_MESSAGE, DEFAULT_MAX_ROUNDS};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub chat: ChatSection,
    pub tools: ToolsSection,
    pub notify: NotifySection,
    pub mail: MailSection,
    pub server: ServerSection,
}

/// [app] 段：人设名与资料文件位置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub persona_dir: PathBuf,
    pub summary_file: String,
    pub profile_file: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Imad Eddine".to_string(),
            persona_dir: PathBuf::from("me"),
            summary_file: "summary.txt".to_string(),
            profile_file: "linkedin.pdf".to_string(),
        }
    }
}

/// [llm] 段：模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时回退到 OPENAI_API_KEY
    pub api_key: Option<String>,
    /// 单次补全请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

/// [chat] 段：工具轮次上限与固定回复
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub max_rounds: usize,
    pub closed_message: String,
    pub failure_message: String,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            closed_message: DEFAULT_CLOSED_MESSAGE.to_string(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// [tools] 段：工具超时、CV 附件、投递错误策略覆盖
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub cv_path: PathBuf,
    pub cv_filename: String,
    /// 按工具名覆盖 surface_delivery_errors
    pub surface_delivery_errors: HashMap<String, bool>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            cv_path: PathBuf::from("me/cv.pdf"),
            cv_filename: "CV.pdf".to_string(),
            surface_delivery_errors: HashMap::new(),
        }
    }
}

/// [notify] 段：Pushover
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub api_url: Option<String>,
    /// 未设置时回退到 PUSHOVER_TOKEN
    pub token: Option<String>,
    /// 未设置时回退到 PUSHOVER_USER
    pub user: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            user: None,
            timeout_secs: 10,
        }
    }
}

/// [mail] 段：SendGrid
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSection {
    pub api_url: Option<String>,
    /// 未设置时回退到 SENDGRID_API_KEY
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            from_email: "noreply@example.com".to_string(),
            from_name: None,
            timeout_secs: 30,
        }
    }
}

/// [server] 段：HTTP 监听地址与欢迎语
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// 为空时按人设名生成
    pub welcome_message: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            welcome_message: None,
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 取配置值，缺失或为空时回退到环境变量
fn credential(configured: &Option<String>, env_key: &str) -> Option<SecretString> {
    configured
        .clone()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var(env_key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
}

impl AppConfig {
    pub fn openai_api_key(&self) -> Option<SecretString> {
        credential(&self.llm.api_key, "OPENAI_API_KEY")
    }

    /// Pushover 需要 token 与 user 同时存在
    pub fn pushover_credentials(&self) -> Option<(SecretString, SecretString)> {
        let token = credential(&self.notify.token, "PUSHOVER_TOKEN")?;
        let user = credential(&self.notify.user, "PUSHOVER_USER")?;
        Some((token, user))
    }

    pub fn sendgrid_api_key(&self) -> Option<SecretString> {
        credential(&self.mail.api_key, "SENDGRID_API_KEY")
    }

    pub fn welcome_message(&self) -> String {
        self.server.welcome_message.clone().unwrap_or_else(|| {
            format!(
                "Hi, I'm {}. Ask me anything about my career, skills or experience.",
                self.app.name
            )
        })
    }
}

/// 从 config 目录加载配置，环境变量 PERSONA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PERSONA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PERSONA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.name, "Imad Eddine");
        assert_eq!(cfg.chat.max_rounds, DEFAULT_MAX_ROUNDS);
        assert_eq!(cfg.chat.closed_message, DEFAULT_CLOSED_MESSAGE);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.notify.timeout_secs, 10);
        assert_eq!(cfg.server.bind_addr(), "127.0.0.1:7860");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[app]
name = "Ada Lovelace"

[chat]
max_rounds = 3

[tools.surface_delivery_errors]
record_user_details = true
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();

        assert_eq!(cfg.app.name, "Ada Lovelace");
        assert_eq!(cfg.chat.max_rounds, 3);
        // 未出现的键保持默认
        assert_eq!(cfg.app.summary_file, "summary.txt");
        assert_eq!(
            cfg.tools.surface_delivery_errors.get("record_user_details"),
            Some(&true)
        );
    }

    #[test]
    fn test_configured_credential_wins() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("sk-from-config".to_string());
        let key = cfg.openai_api_key().unwrap();
        assert_eq!(key.expose_secret(), "sk-from-config");
    }

    #[test]
    fn test_welcome_message_uses_name() {
        let mut cfg = AppConfig::default();
        cfg.app.name = "Ada".to_string();
        assert!(cfg.welcome_message().starts_with("Hi, I'm Ada."));
        cfg.server.welcome_message = Some("Welcome!".to_string());
        assert_eq!(cfg.welcome_message(), "Welcome!");
    }
}
