use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use relay_agent::ReplyComposer;
use relay_channels::{DelayWindow, Dispatcher, TokioPacer};
use relay_core::config::RelayConfig;
use relay_line::LineClient;

mod app;
mod dedup;
mod http;
mod providers;

/// LINE webhook relay: answers chat messages through an LLM, paced like a person typing.
#[derive(Debug, Parser)]
#[command(name = "relay-gateway", version, about)]
struct Args {
    /// Path to the TOML config file (default ~/.relay/relay.toml).
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<String>,

    /// Listen port; overrides the config file and PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > RELAY_CONFIG env > ~/.relay/relay.toml
    let config_path = RelayConfig::resolve_path(args.config.as_deref());
    if !Path::new(&config_path).exists() {
        warn!(path = %config_path, "config file not found, using defaults and environment");
    }
    let mut config = RelayConfig::load(Some(config_path.as_str())).context("invalid configuration")?;
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    let line = LineClient::new(
        config.line.channel_access_token.clone().unwrap_or_default(),
        Some(config.line.api_base.clone()),
    )
    .context("LINE channel access token missing: set line.channel_access_token or LINE_ACCESS_TOKEN")?;

    if config.line.channel_secret.is_none() {
        warn!("line.channel_secret is not set; webhook signatures will NOT be verified");
    }

    let provider = providers::build_provider(&config);
    let persona = relay_agent::persona::load(
        config.agent.persona.as_deref(),
        config.agent.persona_path.as_deref(),
    );
    let composer = ReplyComposer::new(
        provider,
        persona,
        config.agent.model.clone(),
        config.agent.max_tokens,
        config.agent.fallback_reply.clone(),
    );

    let window = DelayWindow::from_millis(config.dispatch.min_delay_ms, config.dispatch.max_delay_ms)
        .ok_or_else(|| anyhow::anyhow!("dispatch.min_delay_ms must not exceed dispatch.max_delay_ms"))?;
    let dispatcher = Dispatcher::new(Arc::new(line), Arc::new(TokioPacer), window)
        .with_max_total_delay(config.dispatch.max_total_delay_ms.map(Duration::from_millis));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        %addr,
        webhook_path = %config.gateway.webhook_path,
        model = %config.agent.model,
        style = ?config.dispatch.style,
        "relay-gateway starting"
    );

    let state = Arc::new(app::AppState::new(config, composer, dispatcher));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("relay-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
    }
    info!("shutdown signal received");
}
