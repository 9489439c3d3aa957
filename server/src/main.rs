use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_server::config::ServerConfig;
use parlor_server::engine::ChatEngine;
use parlor_server::irc::dispatcher::Dispatcher;
use parlor_server::irc::formatter::Formatter;
use parlor_server::irc::listener::start_irc_listener;

#[derive(Parser, Debug)]
#[command(name = "parlor", version, about = "Parlor channel chat server")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "parlor.toml")]
    config: String,

    /// Address to listen on, overriding the config file.
    #[arg(long)]
    listen: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(addr) = args.listen {
        config.server.irc_address = addr;
    }

    let formatter = Arc::new(Formatter::new(
        config.server.server_name.clone(),
        config.irc.motd.clone(),
    ));

    // The dispatcher task is the only writer to the engine.
    let (dispatcher, handle) = Dispatcher::new(ChatEngine::new(), formatter.clone());
    let dispatch_task = tokio::spawn(dispatcher.run());

    let listener = TcpListener::bind(&config.server.irc_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.irc_address))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    info!(
        address = %config.server.irc_address,
        name = %config.server.server_name,
        "Parlor server starting"
    );

    start_irc_listener(
        listener,
        handle,
        formatter,
        config.limits.connection_limits(),
        cancel,
    )
    .await;

    // Open connections still hold dispatcher handles; stop without waiting on them.
    dispatch_task.abort();
    info!("Parlor server stopped");
    Ok(())
}
