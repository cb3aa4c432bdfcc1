//! HTTP client for the broker bridge, with timeout and retry.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::api_types::{
    AccountInfoResponse, BridgeErrorResponse, ConnectRequest, ConnectResponse, DealRequest,
    ModifyRequest, PositionData, PositionsResponse, TradeModifyRequest, TradeResponse,
    TradeResult, TradeSendRequest,
};
use super::error::BrokerError;
use super::{BridgeConfig, RetryConfig};
use rust_decimal::Decimal;

/// REST client for the broker bridge.
///
/// Connection discipline: the bridge requires a `/connect` handshake before
/// trade calls. The client connects lazily on first use and remembers the
/// session; it does not proactively reconnect on every call.
#[derive(Debug)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
    api_key: String,
    account: String,
    password: String,
    server: String,
    retry: RetryConfig,
    connected: Mutex<bool>,
}

impl BridgeClient {
    /// Create a client from config.
    pub fn new(config: &BridgeConfig) -> Result<Self, BrokerError> {
        if config.api_key.is_empty() {
            return Err(BrokerError::AuthenticationFailed);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            account: config.account.clone(),
            password: config.password.clone(),
            server: config.server.clone(),
            retry: config.retry.clone(),
            connected: Mutex::new(false),
        })
    }

    /// Open the bridge session if it is not already open.
    ///
    /// Holds the session lock across the handshake so concurrent callers do
    /// not race a second `/connect`.
    pub async fn ensure_connected(&self) -> Result<(), BrokerError> {
        let mut connected = self.connected.lock().await;
        if *connected {
            return Ok(());
        }

        let body = ConnectRequest {
            account: self.account.clone(),
            password: self.password.clone(),
            server: self.server.clone(),
        };
        let response: ConnectResponse = self.request("POST", "/connect", Some(&body)).await?;
        if !response.connected {
            return Err(BrokerError::AuthenticationFailed);
        }

        *connected = true;
        tracing::info!(server = %self.server, "Bridge session established");
        Ok(())
    }

    /// Submit a deal.
    pub async fn send_deal(&self, deal: DealRequest) -> Result<TradeResult, BrokerError> {
        self.ensure_connected().await?;

        let body = TradeSendRequest {
            account: self.account.clone(),
            request: deal,
        };
        let response: TradeResponse = self.request("POST", "/trade/send", Some(&body)).await?;
        response
            .result
            .ok_or_else(|| BrokerError::JsonParse("trade response missing result".to_string()))
    }

    /// Update stop/target on an existing position.
    pub async fn modify(
        &self,
        ticket: i64,
        sl: Decimal,
        tp: Decimal,
    ) -> Result<TradeResult, BrokerError> {
        self.ensure_connected().await?;

        let body = TradeModifyRequest {
            account: self.account.clone(),
            request: ModifyRequest {
                action: "TRADE_ACTION_MODIFY".to_string(),
                position: ticket,
                sl,
                tp,
            },
        };
        let response: TradeResponse = self.request("POST", "/trade/modify", Some(&body)).await?;
        response
            .result
            .ok_or_else(|| BrokerError::JsonParse("modify response missing result".to_string()))
    }

    /// Fetch account information.
    pub async fn account_info(&self) -> Result<AccountInfoResponse, BrokerError> {
        self.ensure_connected().await?;
        self.request("GET", "/account/info", None::<&()>).await
    }

    /// Fetch open positions.
    pub async fn open_positions(&self) -> Result<Vec<PositionData>, BrokerError> {
        self.ensure_connected().await?;
        let response: PositionsResponse = self.request("GET", "/positions/list", None::<&()>).await?;
        Ok(response.positions)
    }

    /// Internal request implementation with bounded retry.
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, BrokerError> {
        let url = format!("{}{path}", self.base_url);
        let mut backoff = ExponentialBackoff::new(&self.retry);

        loop {
            let request = match method {
                "GET" => self.client.get(&url),
                _ => {
                    let mut req = self.client.post(&url);
                    if let Some(b) = body {
                        req = req.json(b);
                    }
                    req
                }
            }
            .header("X-API-Key", &self.api_key)
            .header("X-Account", &self.account);

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Bridge network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(BrokerError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| BrokerError::Network(e.to_string()))?;
                return serde_json::from_str(&text)
                    .map_err(|e| BrokerError::JsonParse(e.to_string()));
            }

            let error_body = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<BridgeErrorResponse>(&error_body) {
                Ok(err) => (
                    err.code.unwrap_or_else(|| status.as_u16().to_string()),
                    err.message,
                ),
                Err(_) => (status.as_u16().to_string(), error_body),
            };

            if is_retryable(status) {
                if let Some(delay) = backoff.next_backoff() {
                    tracing::warn!(
                        code = %code,
                        message = %message,
                        delay_ms = delay.as_millis(),
                        "Bridge returned retryable error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(BrokerError::MaxRetriesExceeded {
                    attempts: backoff.attempt,
                });
            }

            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(BrokerError::AuthenticationFailed)
                }
                StatusCode::UNPROCESSABLE_ENTITY => Err(BrokerError::Rejected(message)),
                _ => Err(BrokerError::Api { code, message }),
            };
        }
    }
}

/// Whether a status code is worth retrying.
const fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn backoff_doubles_until_exhausted() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        };

        let mut backoff = ExponentialBackoff::new(&config);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn backoff_respects_cap() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            multiplier: 10.0,
        };

        let mut backoff = ExponentialBackoff::new(&config);
        backoff.next_backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }
}
