//! The durable trade record and its status lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetCategory, TakeProfitTarget};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Long.
    Buy,
    /// Short.
    Sell,
}

impl Direction {
    /// The offsetting direction, used when closing a position.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Sign applied to price deltas when computing PnL.
    #[must_use]
    pub const fn pnl_sign(&self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order kind submitted to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Execute at the current market price.
    Market,
    /// Execute at the given price or better.
    Limit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Trade status. Transitions are monotonic: `Pending` and `Open` are the
/// only pre-terminal states, `Partial` is reachable only from `Open`, and
/// `Closed`/`Cancelled`/`Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Acknowledged by the broker but not yet filled (limit orders).
    Pending,
    /// Live position.
    Open,
    /// Partially closed position.
    Partial,
    /// Closed with a realized result.
    Closed,
    /// Cancelled before fill.
    Cancelled,
    /// Execution failed.
    Error,
}

impl TradeStatus {
    /// Returns true if the trade still occupies its symbol slot.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Open | Self::Partial)
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled | Self::Error)
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open => write!(f, "OPEN"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// The durable unit of the ledger.
///
/// Created by the risk engine, mutated by the execution gateway (status
/// transitions) and by [`Trade::close`], owned thereafter by the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Globally unique id.
    pub id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Instrument symbol.
    pub symbol: String,
    /// Trade direction.
    pub direction: Direction,
    /// Order kind.
    pub kind: OrderKind,
    /// Entry price.
    pub entry: Decimal,
    /// Stop loss price.
    pub stop_loss: Decimal,
    /// Primary take-profit price.
    pub take_profit: Decimal,
    /// All take-profit targets in order.
    #[serde(default)]
    pub targets: Vec<TakeProfitTarget>,
    /// Position size in lots.
    pub quantity: Decimal,
    /// Instrument category.
    pub category: AssetCategory,
    /// Confidence of the originating alert, when there was one.
    pub confidence: Option<f64>,
    /// Computed risk-reward ratio.
    pub risk_reward: Decimal,
    /// Current status.
    pub status: TradeStatus,
    /// Broker ticket, once the order is live.
    pub ticket: Option<i64>,
    /// Exit price, set on close.
    pub exit_price: Option<Decimal>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Realized profit/loss in account currency.
    pub pnl: Option<Decimal>,
    /// Realized profit/loss as a percentage of the entry price.
    pub pnl_percent: Option<Decimal>,
}

impl Trade {
    /// Close the trade at `exit_price`.
    ///
    /// PnL = (exit - entry) x (+1 for Buy, -1 for Sell) x quantity;
    /// PnL% is the directional price delta over the entry, times 100.
    /// Pure with respect to persistence: writing the updated record back is
    /// the journal's job.
    #[must_use]
    pub fn close(mut self, exit_price: Decimal, at: DateTime<Utc>) -> Self {
        let delta = (exit_price - self.entry) * self.direction.pnl_sign();
        self.pnl = Some(delta * self.quantity);
        self.pnl_percent = if self.entry.is_zero() {
            None
        } else {
            Some(delta / self.entry * Decimal::ONE_HUNDRED)
        };
        self.exit_price = Some(exit_price);
        self.closed_at = Some(at);
        self.status = TradeStatus::Closed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy_trade() -> Trade {
        Trade {
            id: "t-1".to_string(),
            created_at: Utc::now(),
            symbol: "EURUSD".to_string(),
            direction: Direction::Buy,
            kind: OrderKind::Market,
            entry: dec!(1.0900),
            stop_loss: dec!(1.0880),
            take_profit: dec!(1.0950),
            targets: vec![],
            quantity: dec!(1.0),
            category: AssetCategory::Forex,
            confidence: Some(0.7),
            risk_reward: dec!(2.5),
            status: TradeStatus::Open,
            ticket: Some(42),
            exit_price: None,
            closed_at: None,
            pnl: None,
            pnl_percent: None,
        }
    }

    #[test]
    fn status_lifecycle_flags() {
        assert!(TradeStatus::Pending.is_active());
        assert!(TradeStatus::Open.is_active());
        assert!(TradeStatus::Partial.is_active());
        assert!(TradeStatus::Closed.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
        assert!(TradeStatus::Error.is_terminal());
        assert!(!TradeStatus::Open.is_terminal());
    }

    #[test]
    fn close_buy_in_profit() {
        let closed = buy_trade().close(dec!(1.0950), Utc::now());

        assert_eq!(closed.status, TradeStatus::Closed);
        assert_eq!(closed.pnl, Some(dec!(0.0050)));
        assert!(closed.pnl_percent.unwrap() > Decimal::ZERO);
        assert_eq!(closed.exit_price, Some(dec!(1.0950)));
        assert!(closed.closed_at.is_some());
    }

    #[test]
    fn close_sell_mirrors_sign() {
        let mut trade = buy_trade();
        trade.direction = Direction::Sell;
        let closed = trade.close(dec!(1.0950), Utc::now());

        assert_eq!(closed.pnl, Some(dec!(-0.0050)));
        assert!(closed.pnl_percent.unwrap() < Decimal::ZERO);
    }

    #[test]
    fn close_scales_with_quantity() {
        let mut trade = buy_trade();
        trade.quantity = dec!(2.0);
        let closed = trade.close(dec!(1.0950), Utc::now());

        assert_eq!(closed.pnl, Some(dec!(0.0100)));
    }
}
