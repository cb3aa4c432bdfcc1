//! Axum router for the webhook and status endpoints.
//!
//! The webhook acknowledges with 200 regardless of internal outcome: a
//! failure status would trigger sender-side redelivery rather than
//! recovery. Failures are observable through logs and the status surface.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::events::ChannelUpdate;
use crate::execution::BrokerPort;
use crate::journal::{TradeFilter, TradeStats};
use crate::models::{Direction, Trade, TradeStatus};
use crate::notifier::Notifier;
use crate::pipeline::Pipeline;

/// Shared state for the HTTP server.
pub struct AppState<B: BrokerPort, N: Notifier> {
    pipeline: Arc<Pipeline<B, N>>,
}

impl<B: BrokerPort, N: Notifier> Clone for AppState<B, N> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<B: BrokerPort, N: Notifier> AppState<B, N> {
    /// Wrap a pipeline for the server.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline<B, N>>) -> Self {
        Self { pipeline }
    }
}

/// Create the Axum router with all endpoints.
#[must_use]
pub fn create_router<B, N>(state: AppState<B, N>) -> Router
where
    B: BrokerPort + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(post_webhook).get(get_webhook))
        .route("/status", get(get_status))
        .route("/trades", get(get_trades))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Webhook acknowledgement body. Always `ok: true`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Always true.
    pub ok: bool,
}

/// Inbound webhook endpoint.
///
/// The body is taken as a raw string so a malformed payload still gets the
/// 200 acknowledgement instead of an extractor-generated 400.
async fn post_webhook<B: BrokerPort, N: Notifier>(
    State(state): State<AppState<B, N>>,
    headers: HeaderMap,
    body: String,
) -> Json<WebhookAck> {
    if let Some(expected) = &state.pipeline.config().webhook_secret {
        let provided = headers
            .get("x-webhook-secret")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("Webhook secret mismatch; event dropped");
            return Json(WebhookAck { ok: true });
        }
    }

    match serde_json::from_str::<ChannelUpdate>(&body) {
        Ok(update) => state.pipeline.handle_update(update).await,
        Err(e) => tracing::warn!(error = %e, "Undecodable webhook payload dropped"),
    }

    Json(WebhookAck { ok: true })
}

/// Static webhook status flags.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookStatus {
    /// Endpoint liveness marker.
    pub status: String,
    /// Whether a shared secret is configured.
    pub requires_secret: bool,
    /// Kill-switch state.
    pub trading_enabled: bool,
    /// Armed state.
    pub bot_armed: bool,
    /// Minimum confidence gate.
    pub min_confidence: f64,
}

/// Webhook status endpoint.
async fn get_webhook<B: BrokerPort, N: Notifier>(
    State(state): State<AppState<B, N>>,
) -> Json<WebhookStatus> {
    let config = state.pipeline.config();
    Json(WebhookStatus {
        status: "active".to_string(),
        requires_secret: config.webhook_secret.is_some(),
        trading_enabled: config.allow_trading,
        bot_armed: config.armed,
        min_confidence: config.min_confidence,
    })
}

/// One active position in the status response.
#[derive(Debug, Serialize)]
struct OpenPositionView {
    id: String,
    symbol: String,
    direction: Direction,
    entry: Decimal,
    quantity: Decimal,
    risk_reward: Decimal,
}

impl From<&Trade> for OpenPositionView {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            direction: trade.direction,
            entry: trade.entry,
            quantity: trade.quantity,
            risk_reward: trade.risk_reward,
        }
    }
}

/// Daily slice of the status response.
#[derive(Debug, Serialize)]
struct TodaySummary {
    trades: usize,
    wins: usize,
    losses: usize,
    win_rate: Decimal,
}

/// Bot status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    status: String,
    armed: bool,
    trading: bool,
    timestamp: String,
    summary: TradeStats,
    today: TodaySummary,
    open_positions: Vec<OpenPositionView>,
}

/// Bot status endpoint: journal summary plus today's slice.
async fn get_status<B: BrokerPort, N: Notifier>(
    State(state): State<AppState<B, N>>,
) -> Json<StatusResponse> {
    let pipeline = &state.pipeline;
    let config = pipeline.config();
    let journal = pipeline.journal();

    let now = Utc::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc());
    let today_trades = journal.filter(&TradeFilter {
        from: midnight,
        ..Default::default()
    });
    let today_stats = TradeStats::compute(&today_trades);

    let active = journal.active();

    Json(StatusResponse {
        status: "ONLINE".to_string(),
        armed: config.armed,
        trading: config.allow_trading,
        timestamp: now.to_rfc3339(),
        summary: journal.stats(),
        today: TodaySummary {
            trades: today_trades.len(),
            wins: today_stats.winning_trades,
            losses: today_stats.losing_trades,
            win_rate: today_stats.win_rate,
        },
        open_positions: active.iter().map(OpenPositionView::from).collect(),
    })
}

/// Query parameters for the trade list endpoint.
#[derive(Debug, Deserialize)]
struct TradesQuery {
    status: Option<String>,
    symbol: Option<String>,
    limit: Option<usize>,
    stats: Option<bool>,
}

/// Trade list response.
#[derive(Debug, Serialize)]
struct TradesResponse {
    trades: Vec<Trade>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<TradeStats>,
}

/// Trade list endpoint with optional filters.
async fn get_trades<B: BrokerPort, N: Notifier>(
    State(state): State<AppState<B, N>>,
    Query(query): Query<TradesQuery>,
) -> Json<TradesResponse> {
    let filter = TradeFilter {
        status: query.status.as_deref().and_then(parse_status),
        symbol: query.symbol.clone(),
        ..Default::default()
    };

    let mut trades = state.pipeline.journal().filter(&filter);
    let limit = query.limit.unwrap_or(100).min(1000);
    trades.truncate(limit);

    let stats = if query.stats.unwrap_or(false) {
        Some(TradeStats::compute(&trades))
    } else {
        None
    };

    let count = trades.len();
    Json(TradesResponse {
        trades,
        count,
        stats,
    })
}

fn parse_status(raw: &str) -> Option<TradeStatus> {
    match raw.to_uppercase().as_str() {
        "PENDING" => Some(TradeStatus::Pending),
        "OPEN" => Some(TradeStatus::Open),
        "PARTIAL" => Some(TradeStatus::Partial),
        "CLOSED" => Some(TradeStatus::Closed),
        "CANCELLED" => Some(TradeStatus::Cancelled),
        "ERROR" => Some(TradeStatus::Error),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BridgeClient, BridgeConfig, RetryConfig};
    use crate::config::Config;
    use crate::execution::ExecutionGateway;
    use crate::journal::Journal;
    use crate::notifier::RecordingNotifier;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_state(config: Config) -> AppState<BridgeClient, RecordingNotifier> {
        let bridge_config = BridgeConfig::new(
            "http://127.0.0.1:1",
            "test-key",
            "100",
            "pw",
            "Demo",
        )
        .with_timeout(Duration::from_millis(50))
        .with_retry(RetryConfig::none());
        let broker = BridgeClient::new(&bridge_config).unwrap();
        let gateway = ExecutionGateway::new(broker);
        let pipeline = Pipeline::new(
            config,
            gateway,
            RecordingNotifier::new(),
            Journal::in_memory(),
        );
        AppState::new(Arc::new(pipeline))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = create_router(make_state(Config::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_get_reports_flags() {
        let config = Config {
            allow_trading: true,
            armed: false,
            webhook_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        let app = create_router(make_state(config));

        let response = app
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "active");
        assert_eq!(json["requires_secret"], true);
        assert_eq!(json["trading_enabled"], true);
        assert_eq!(json["bot_armed"], false);
    }

    #[tokio::test]
    async fn webhook_post_acknowledges_garbage() {
        let app = create_router(make_state(Config::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from("not json at all"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn webhook_post_with_wrong_secret_still_acknowledges() {
        let config = Config {
            webhook_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        let app = create_router(make_state(config));

        let update = r#"{"update_id": 1}"#;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .header("x-webhook-secret", "wrong")
                    .body(Body::from(update))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_empty_journal() {
        let app = create_router(make_state(Config::default()));

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ONLINE");
        assert_eq!(json["summary"]["total_trades"], 0);
        assert_eq!(json["open_positions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn trades_endpoint_filters_by_status() {
        let response = create_router(make_state(Config::default()))
            .oneshot(
                Request::builder()
                    .uri("/trades?status=OPEN&stats=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["count"], 0);
        assert!(json["stats"].is_object());
    }
}
