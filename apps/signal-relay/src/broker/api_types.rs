//! Broker bridge request and response types.
//!
//! These map directly to the bridge's REST format. The bridge speaks the
//! terminal's native vocabulary: numeric order-type codes, `retcode`
//! strings, and a `magic` tag identifying the robot that owns an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Direction;

/// Return code the bridge reports for an executed request.
pub const RETCODE_DONE: &str = "TRADE_RETCODE_DONE";

/// Numeric order-type code for a direction/pending combination.
///
/// 0=BUY, 1=SELL, 2=BUY_LIMIT, 3=SELL_LIMIT, 4=BUY_STOP, 5=SELL_STOP.
#[must_use]
pub const fn order_type_code(direction: Direction, pending: bool) -> u8 {
    match (direction, pending) {
        (Direction::Buy, false) => 0,
        (Direction::Sell, false) => 1,
        (Direction::Buy, true) => 2,
        (Direction::Sell, true) => 3,
    }
}

/// Body for `POST /connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest {
    /// Account number.
    pub account: String,
    /// Account password.
    pub password: String,
    /// Terminal server name.
    pub server: String,
}

/// Response from `POST /connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectResponse {
    /// Whether the session is live.
    #[serde(default)]
    pub connected: bool,
}

/// A deal request inside `POST /trade/send`.
#[derive(Debug, Clone, Serialize)]
pub struct DealRequest {
    /// Bridge action, always `TRADE_ACTION_DEAL` for deals.
    pub action: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Volume in lots.
    pub volume: Decimal,
    /// Numeric order-type code.
    #[serde(rename = "type")]
    pub order_type: u8,
    /// Price for pending orders; zero for market deals.
    pub price: Decimal,
    /// Stop loss level.
    pub sl: Decimal,
    /// Take profit level.
    pub tp: Decimal,
    /// Free-form comment attached to the order.
    pub comment: String,
    /// Robot tag.
    pub magic: i64,
    /// Maximum acceptable slippage in points.
    pub deviation: u32,
}

/// Envelope for `POST /trade/send`.
#[derive(Debug, Clone, Serialize)]
pub struct TradeSendRequest {
    /// Account number.
    pub account: String,
    /// The deal.
    pub request: DealRequest,
}

/// A modify request inside `POST /trade/modify`.
#[derive(Debug, Clone, Serialize)]
pub struct ModifyRequest {
    /// Bridge action, always `TRADE_ACTION_MODIFY`.
    pub action: String,
    /// Ticket of the position to modify.
    pub position: i64,
    /// New stop loss; zero clears it.
    pub sl: Decimal,
    /// New take profit; zero clears it.
    pub tp: Decimal,
}

/// Envelope for `POST /trade/modify`.
#[derive(Debug, Clone, Serialize)]
pub struct TradeModifyRequest {
    /// Account number.
    pub account: String,
    /// The modification.
    pub request: ModifyRequest,
}

/// Result block in trade responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResult {
    /// Bridge return code; [`RETCODE_DONE`] on success.
    pub retcode: String,
    /// Ticket of the created order.
    #[serde(default)]
    pub order: Option<i64>,
    /// Bridge comment, carries the rejection reason on failure.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response from trade endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResponse {
    /// Result block; absent means a malformed response.
    #[serde(default)]
    pub result: Option<TradeResult>,
}

/// Response from `GET /account/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoResponse {
    /// Account login.
    pub login: i64,
    /// Account currency.
    pub currency: String,
    /// Balance.
    pub balance: Decimal,
    /// Equity.
    pub equity: Decimal,
    /// Margin in use.
    pub margin: Decimal,
    /// Floating profit.
    #[serde(default)]
    pub profit: Decimal,
    /// Leverage.
    #[serde(default)]
    pub leverage: i64,
    /// Open position count.
    #[serde(default)]
    pub positions: u32,
}

/// One position in `GET /positions/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionData {
    /// Position ticket.
    pub ticket: i64,
    /// Instrument symbol.
    pub symbol: String,
    /// Position type code: 0=BUY, 1=SELL.
    #[serde(rename = "type")]
    pub position_type: u8,
    /// Volume in lots.
    pub volume: Decimal,
    /// Open price.
    pub price_open: Decimal,
    /// Open time, unix seconds.
    #[serde(default)]
    pub time_open: i64,
    /// Current market price.
    pub price_current: Decimal,
    /// Floating profit.
    #[serde(default)]
    pub profit: Decimal,
    /// Order comment.
    #[serde(default)]
    pub comment: String,
}

impl PositionData {
    /// Direction of the live position.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        if self.position_type == 0 {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }
}

/// Response from `GET /positions/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionsResponse {
    /// Open positions.
    #[serde(default)]
    pub positions: Vec<PositionData>,
}

/// Error payload the bridge returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeErrorResponse {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_codes_match_bridge_vocabulary() {
        assert_eq!(order_type_code(Direction::Buy, false), 0);
        assert_eq!(order_type_code(Direction::Sell, false), 1);
        assert_eq!(order_type_code(Direction::Buy, true), 2);
        assert_eq!(order_type_code(Direction::Sell, true), 3);
    }

    #[test]
    fn deal_request_serializes_type_field() {
        let deal = DealRequest {
            action: "TRADE_ACTION_DEAL".to_string(),
            symbol: "EURUSD".to_string(),
            volume: rust_decimal_macros::dec!(0.10),
            order_type: 0,
            price: rust_decimal_macros::dec!(0),
            sl: rust_decimal_macros::dec!(1.0880),
            tp: rust_decimal_macros::dec!(1.0950),
            comment: "Bot Trade".to_string(),
            magic: 99_999,
            deviation: 10,
        };

        let json = serde_json::to_value(&deal).unwrap();
        assert_eq!(json["type"], 0);
        assert_eq!(json["magic"], 99_999);
    }

    #[test]
    fn position_direction_from_type_code() {
        let position = PositionData {
            ticket: 1,
            symbol: "EURUSD".to_string(),
            position_type: 1,
            volume: rust_decimal_macros::dec!(0.5),
            price_open: rust_decimal_macros::dec!(1.09),
            time_open: 0,
            price_current: rust_decimal_macros::dec!(1.08),
            profit: rust_decimal_macros::dec!(50),
            comment: String::new(),
        };

        assert_eq!(position.direction(), Direction::Sell);
    }
}
