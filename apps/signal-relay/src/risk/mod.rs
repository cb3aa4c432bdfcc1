//! Order construction with risk bounds.
//!
//! Turns a validated alert or a confirmed menu draft into a risk-bounded
//! [`Trade`]: re-checks price ordering, enforces the risk-reward floor, and
//! sizes the position from the account balance. Never talks to the broker.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AssetCategory, Direction, OrderKind, TakeProfitTarget, Trade, TradeStatus};

/// Sizing and gating limits, loaded from configuration.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    /// Fraction of the balance risked per trade.
    pub risk_per_trade: Decimal,
    /// Smallest order size in lots.
    pub min_lot: Decimal,
    /// Largest order size in lots.
    pub max_lot: Decimal,
    /// Lot granularity; quantities are rounded down to a multiple of this.
    pub lot_step: Decimal,
    /// Minimum acceptable risk-reward ratio.
    pub min_risk_reward: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            risk_per_trade: dec!(0.10),
            min_lot: dec!(0.10),
            max_lot: dec!(2.0),
            lot_step: dec!(0.01),
            min_risk_reward: dec!(0.5),
        }
    }
}

/// Why the risk engine refused to build an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskRejection {
    /// Entry price missing or non-positive.
    #[error("entry price must be positive")]
    EntryNotPositive,
    /// Stop or target sits exactly on the entry.
    #[error("stop/target cannot equal the entry price")]
    LevelEqualsEntry,
    /// Levels are on the wrong side of the entry for the direction.
    #[error("{direction}: stop/target on the wrong side of entry")]
    PriceOrdering {
        /// Direction the ordering was checked against.
        direction: Direction,
    },
    /// Reward too small for the risk taken.
    #[error("risk-reward {ratio} below minimum {min}")]
    RiskRewardTooLow {
        /// Computed ratio.
        ratio: Decimal,
        /// Configured floor.
        min: Decimal,
    },
    /// Account balance missing or non-positive.
    #[error("account balance must be positive")]
    BalanceNotPositive,
}

/// Input to [`RiskEngine::build_order`]. Both the channel-alert path and the
/// menu path funnel into this shape.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Instrument symbol.
    pub symbol: String,
    /// Trade direction.
    pub direction: Direction,
    /// Order kind.
    pub kind: OrderKind,
    /// Entry price.
    pub entry: Decimal,
    /// Stop loss.
    pub stop: Decimal,
    /// Primary take-profit.
    pub target: Decimal,
    /// All take-profit targets.
    pub targets: Vec<TakeProfitTarget>,
    /// Instrument category.
    pub category: AssetCategory,
    /// Confidence of the originating alert, when scored.
    pub confidence: Option<f64>,
}

/// Risk-reward ratio: reward distance over risk distance from entry.
#[must_use]
pub fn risk_reward(entry: Decimal, stop: Decimal, target: Decimal) -> Option<Decimal> {
    let risk = (entry - stop).abs();
    if risk.is_zero() {
        return None;
    }
    Some((target - entry).abs() / risk)
}

/// Deterministic order construction.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    limits: RiskLimits,
}

impl RiskEngine {
    /// Create an engine with the given limits.
    #[must_use]
    pub const fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    /// The configured limits.
    #[must_use]
    pub const fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Build a risk-bounded trade from a request.
    ///
    /// The parser already checked price ordering for channel alerts, but
    /// the menu path bypasses the parser, so ordering is re-validated here.
    pub fn build_order(
        &self,
        request: &OrderRequest,
        balance: Decimal,
    ) -> Result<Trade, RiskRejection> {
        if request.entry <= Decimal::ZERO {
            return Err(RiskRejection::EntryNotPositive);
        }
        if balance <= Decimal::ZERO {
            return Err(RiskRejection::BalanceNotPositive);
        }
        if request.stop == request.entry || request.target == request.entry {
            return Err(RiskRejection::LevelEqualsEntry);
        }

        let ordered = match request.direction {
            Direction::Buy => request.stop < request.entry && request.target > request.entry,
            Direction::Sell => request.target < request.entry && request.stop > request.entry,
        };
        if !ordered {
            return Err(RiskRejection::PriceOrdering {
                direction: request.direction,
            });
        }

        let ratio = risk_reward(request.entry, request.stop, request.target)
            .ok_or(RiskRejection::LevelEqualsEntry)?;
        if ratio < self.limits.min_risk_reward {
            return Err(RiskRejection::RiskRewardTooLow {
                ratio,
                min: self.limits.min_risk_reward,
            });
        }

        let quantity = self.position_size(balance, request.entry, request.stop);

        Ok(Trade {
            id: format!("TRD-{}", Uuid::new_v4()),
            created_at: Utc::now(),
            symbol: request.symbol.clone(),
            direction: request.direction,
            kind: request.kind,
            entry: request.entry,
            stop_loss: request.stop,
            take_profit: request.target,
            targets: request.targets.clone(),
            quantity,
            category: request.category,
            confidence: request.confidence,
            risk_reward: ratio,
            status: TradeStatus::Pending,
            ticket: None,
            exit_price: None,
            closed_at: None,
            pnl: None,
            pnl_percent: None,
        })
    }

    /// Size a position so that hitting the stop loses the targeted risk
    /// amount, then round down to the lot step and clamp to the lot range.
    fn position_size(&self, balance: Decimal, entry: Decimal, stop: Decimal) -> Decimal {
        let risk_amount = balance * self.limits.risk_per_trade;
        let risk_distance = (entry - stop).abs();

        let raw = risk_amount / risk_distance;
        let stepped = (raw / self.limits.lot_step).floor() * self.limits.lot_step;

        stepped.clamp(self.limits.min_lot, self.limits.max_lot)
    }
}
