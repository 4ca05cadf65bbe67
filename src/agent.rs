//! Agent 组装
//!
//! 启动时按配置构建一次：人设资料、通知/邮件投递端、工具注册表、模型客户端，
//! 最终得到多会话共享的 ConversationLoop。任何缺失的必需项（资料文件、模型 API Key）都是启动错误。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::chat::{ChatSettings, ConversationLoop};
use crate::config::AppConfig;
use crate::core::SessionStateStore;
use crate::integrations::{
    MailSink, NotificationSink, PushoverNotifier, SendGridMailer, UnconfiguredNotifier,
};
use crate::llm::{ModelClient, OpenAiClient};
use crate::persona::PersonaKnowledgeBase;
use crate::tools::{
    RecordUnknownQuestionTool, RecordUserDetailsTool, SendEmailWithCvTool, StopConversationTool,
    ToolDispatcher, ToolRegistry,
};

/// 预构建的 Agent 组件，可多会话共享
pub struct AgentComponents {
    pub conversation: Arc<ConversationLoop>,
    pub persona_name: String,
    pub welcome_message: String,
}

/// Pushover 凭据不全时退化为始终失败的投递端，只在启动时告警一次
pub fn create_notifier(cfg: &AppConfig) -> anyhow::Result<Arc<dyn NotificationSink>> {
    match cfg.pushover_credentials() {
        Some((token, user)) => {
            let notifier = PushoverNotifier::new(
                token,
                user,
                cfg.notify.api_url.as_deref(),
                Duration::from_secs(cfg.notify.timeout_secs),
            )
            .context("Failed to build Pushover client")?;
            Ok(Arc::new(notifier))
        }
        None => {
            tracing::warn!("Pushover credentials missing; notifications will not be delivered");
            Ok(Arc::new(UnconfiguredNotifier))
        }
    }
}

/// SendGrid Key 缺失时仍然构建，由 CV 工具在调用时报告 "Email service not configured"
pub fn create_mailer(cfg: &AppConfig) -> anyhow::Result<Arc<dyn MailSink>> {
    let api_key = cfg.sendgrid_api_key();
    if api_key.is_none() {
        tracing::warn!("SENDGRID_API_KEY missing; CV emails are disabled");
    }
    let mailer = SendGridMailer::new(
        api_key,
        cfg.mail.from_email.clone(),
        cfg.mail.from_name.clone(),
        cfg.mail.api_url.as_deref(),
        Duration::from_secs(cfg.mail.timeout_secs),
    )
    .context("Failed to build SendGrid client")?;
    Ok(Arc::new(mailer))
}

/// 注册四个工具（顺序即工具目录顺序），再应用 [tools.surface_delivery_errors] 覆盖
pub fn create_tool_registry(
    cfg: &AppConfig,
    notifier: Arc<dyn NotificationSink>,
    mailer: Arc<dyn MailSink>,
) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(RecordUserDetailsTool::new(Arc::clone(&notifier)));
    tools.register(RecordUnknownQuestionTool::new(notifier));
    tools.register(SendEmailWithCvTool::new(
        mailer,
        cfg.tools.cv_path.clone(),
        cfg.tools.cv_filename.clone(),
        cfg.app.name.clone(),
    ));
    tools.register(StopConversationTool);

    for (name, surface) in &cfg.tools.surface_delivery_errors {
        if !tools.set_surface_delivery_errors(name, *surface) {
            tracing::warn!(tool = %name, "surface_delivery_errors override for unknown tool ignored");
        }
    }
    tools
}

/// 用给定的模型与投递端组装对话循环（测试可直接注入 Mock）
pub fn create_conversation(
    cfg: &AppConfig,
    persona: PersonaKnowledgeBase,
    model: Arc<dyn ModelClient>,
    notifier: Arc<dyn NotificationSink>,
    mailer: Arc<dyn MailSink>,
) -> ConversationLoop {
    let tools = create_tool_registry(cfg, notifier, mailer);
    let settings = ChatSettings {
        max_rounds: cfg.chat.max_rounds,
        closed_message: cfg.chat.closed_message.clone(),
        failure_message: cfg.chat.failure_message.clone(),
    };
    ConversationLoop::new(
        model,
        ToolDispatcher::new(tools, cfg.tools.tool_timeout_secs),
        SessionStateStore::new(),
        Arc::new(persona),
        settings,
    )
}

/// 创建 Agent 组件：从配置加载人设、OpenAI 客户端、投递端与工具
pub fn create_agent_components(cfg: &AppConfig) -> anyhow::Result<AgentComponents> {
    let persona = PersonaKnowledgeBase::load(
        &cfg.app.name,
        &cfg.app.persona_dir,
        &cfg.app.summary_file,
        &cfg.app.profile_file,
    )
    .context("Failed to load persona")?;

    let api_key = cfg
        .openai_api_key()
        .context("OPENAI_API_KEY is not set (llm.api_key or environment)")?;
    let model = OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        &api_key,
        Duration::from_secs(cfg.llm.request_timeout_secs),
    )
    .context("Failed to build OpenAI client")?;
    tracing::info!(model = %cfg.llm.model, "LLM client ready");

    if cfg.mail.timeout_secs >= cfg.tools.tool_timeout_secs {
        tracing::warn!(
            mail_timeout_secs = cfg.mail.timeout_secs,
            tool_timeout_secs = cfg.tools.tool_timeout_secs,
            "Mail timeout is not below the tool timeout; slow sends will be reported as tool timeouts"
        );
    }

    let notifier = create_notifier(cfg)?;
    let mailer = create_mailer(cfg)?;
    let conversation = create_conversation(cfg, persona, Arc::new(model), notifier, mailer);
    tracing::info!(
        tools = ?conversation.tool_names(),
        max_rounds = cfg.chat.max_rounds,
        "Conversation loop ready"
    );

    Ok(AgentComponents {
        conversation: Arc::new(conversation),
        persona_name: cfg.app.name.clone(),
        welcome_message: cfg.welcome_message(),
    })
}
