//! Signal Relay Binary
//!
//! Starts the signal-to-trade pipeline: webhook server, idempotency sweep,
//! and the broker bridge session.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin signal-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required for live execution
//! - `BRIDGE_API_KEY`: Broker bridge API key
//! - `BRIDGE_ACCOUNT`: Account number
//! - `BRIDGE_PASSWORD`: Account password
//! - `CHAT_BOT_TOKEN`: Chat bot token for notifications
//!
//! ## Optional
//! - `ALLOW_TRADING`: Kill-switch, `true` to enable (default: false)
//! - `ARMED`: Auto-execution flag (default: false)
//! - `MIN_ALERT_CONFIDENCE`: Confidence gate (default: 0.65)
//! - `HTTP_PORT`: Webhook server port (default: 8080)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use signal_relay::broker::{BridgeClient, BridgeConfig};
use signal_relay::config::Config;
use signal_relay::execution::ExecutionGateway;
use signal_relay::journal::Journal;
use signal_relay::notifier::ChannelNotifier;
use signal_relay::pipeline::Pipeline;
use signal_relay::server::{AppState, create_router};
use tokio::net::TcpListener;
use tokio::signal;

/// HTTP timeout for outbound notification calls.
const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting Signal Relay");

    let config = Config::from_env()?;
    log_config(&config);

    let pipeline = Arc::new(build_pipeline(config.clone())?);

    spawn_sweeper(&config, Arc::clone(&pipeline));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Webhook server listening");

    let router = create_router(AppState::new(pipeline));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Signal Relay stopped");
    Ok(())
}

/// Load a .env file when present; absence is fine in production.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        tracing::debug!("No .env file found");
    }
}

/// Initialize the tracing subscriber with environment filter.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "signal_relay=info"
                    .parse()
                    .expect("static directive 'signal_relay=info' is valid"),
            ),
        )
        .init();
}

/// Log the parsed configuration.
fn log_config(config: &Config) {
    tracing::info!(
        trading_enabled = config.allow_trading,
        armed = config.armed,
        min_confidence = config.min_confidence,
        max_open_trades = config.max_open_trades,
        http_port = config.http_port,
        secret_configured = config.webhook_secret.is_some(),
        "Configuration loaded"
    );
}

/// Wire the pipeline from configuration.
fn build_pipeline(config: Config) -> anyhow::Result<Pipeline<BridgeClient, ChannelNotifier>> {
    let bridge_config = BridgeConfig::new(
        config.bridge_url.clone(),
        config.bridge_api_key.clone(),
        config.bridge_account.clone(),
        config.bridge_password.clone(),
        config.bridge_server.clone(),
    );
    let broker = BridgeClient::new(&bridge_config)?;
    let gateway = ExecutionGateway::new(broker);

    let notifier = ChannelNotifier::new(
        config.chat_api_url.clone(),
        config.chat_bot_token.clone(),
        config.exec_group_id,
        NOTIFIER_TIMEOUT,
    )?;

    let journal = Journal::new(
        config.journal_csv_path.clone(),
        config.journal_jsonl_path.clone(),
        config.journal_enabled,
    );

    Ok(Pipeline::new(config, gateway, notifier, journal))
}

/// Spawn the periodic sweep over the idempotency cache and expired menu
/// sessions. The only time-driven process in the system.
fn spawn_sweeper(config: &Config, pipeline: Arc<Pipeline<BridgeClient, ChannelNotifier>>) {
    let period = Duration::from_secs(config.dedup_sweep_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            pipeline.dedup().sweep();
            pipeline.sessions().purge_expired(chrono::Utc::now());
        }
    });
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
