//! Persona Echo
//!
//! 入口：加载 .env、初始化日志与配置、组装对话循环，启动 HTTP 服务直到收到退出信号。

use anyhow::Context;
use persona_echo::{
    agent::create_agent_components,
    config::load_config,
    core::ShutdownManager,
    observability,
    server::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在不算错误
    let _ = dotenvy::dotenv();
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let components = create_agent_components(&cfg)?;
    let app = create_router(AppState::from(components));

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    let shutdown = ShutdownManager::new();
    shutdown.install_signal_handlers();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().wait_for_shutdown())
        .await
        .context("Server error")?;

    tracing::info!(reason = ?shutdown.reason(), "Server stopped");
    Ok(())
}
