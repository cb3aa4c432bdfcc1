//! Aggregate statistics derived from the journal.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{Trade, TradeStatus};

/// Sentinel profit factor when there are profits but no losses.
const PROFIT_FACTOR_CAP: Decimal = dec!(999);

/// Aggregate trading statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStats {
    /// Total trades in the set.
    pub total_trades: usize,
    /// Trades still active (Pending/Open/Partial).
    pub open_trades: usize,
    /// Closed trades with a realized result.
    pub closed_trades: usize,
    /// Closed trades with positive PnL.
    pub winning_trades: usize,
    /// Closed trades with negative PnL.
    pub losing_trades: usize,
    /// Winners over closed, as a percentage.
    pub win_rate: Decimal,
    /// Sum of realized PnL.
    pub total_pnl: Decimal,
    /// Mean realized PnL percent across closed trades.
    pub total_pnl_percent: Decimal,
    /// Mean winning PnL.
    pub average_win: Decimal,
    /// Mean losing PnL (absolute value).
    pub average_loss: Decimal,
    /// Largest single win.
    pub largest_win: Decimal,
    /// Largest single loss (negative).
    pub largest_loss: Decimal,
    /// Gross profit over gross loss, saturating at 999 when gross loss is
    /// zero.
    pub profit_factor: Decimal,
    /// Mean risk-reward across all trades, not just closed ones.
    pub mean_risk_reward: Decimal,
}

impl TradeStats {
    /// Compute statistics over a set of trades.
    #[must_use]
    pub fn compute(trades: &[Trade]) -> Self {
        let closed: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed && t.pnl.is_some())
            .collect();
        let winning: Vec<&Trade> = closed
            .iter()
            .filter(|t| t.pnl.is_some_and(|p| p > Decimal::ZERO))
            .copied()
            .collect();
        let losing: Vec<&Trade> = closed
            .iter()
            .filter(|t| t.pnl.is_some_and(|p| p < Decimal::ZERO))
            .copied()
            .collect();

        let total_pnl: Decimal = closed.iter().filter_map(|t| t.pnl).sum();
        let gross_profit: Decimal = winning.iter().filter_map(|t| t.pnl).sum();
        let gross_loss: Decimal = losing
            .iter()
            .filter_map(|t| t.pnl)
            .sum::<Decimal>()
            .abs();

        let win_rate = ratio(winning.len(), closed.len()) * Decimal::ONE_HUNDRED;
        let average_win = mean(gross_profit, winning.len());
        let average_loss = mean(gross_loss, losing.len());

        let profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit / gross_loss
        } else if gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_CAP
        } else {
            Decimal::ZERO
        };

        let largest_win = winning
            .iter()
            .filter_map(|t| t.pnl)
            .max()
            .unwrap_or(Decimal::ZERO);
        let largest_loss = losing
            .iter()
            .filter_map(|t| t.pnl)
            .min()
            .unwrap_or(Decimal::ZERO);

        let rr_values: Vec<Decimal> = trades
            .iter()
            .map(|t| t.risk_reward)
            .filter(|rr| *rr > Decimal::ZERO)
            .collect();
        let mean_risk_reward = mean(rr_values.iter().copied().sum(), rr_values.len());

        let pnl_percent_sum: Decimal = closed.iter().filter_map(|t| t.pnl_percent).sum();
        let total_pnl_percent = mean(pnl_percent_sum, closed.len());

        Self {
            total_trades: trades.len(),
            open_trades: trades.iter().filter(|t| t.status.is_active()).count(),
            closed_trades: closed.len(),
            winning_trades: winning.len(),
            losing_trades: losing.len(),
            win_rate: win_rate.round_dp(2),
            total_pnl: total_pnl.round_dp(2),
            total_pnl_percent: total_pnl_percent.round_dp(2),
            average_win: average_win.round_dp(2),
            average_loss: average_loss.round_dp(2),
            largest_win: largest_win.round_dp(2),
            largest_loss: largest_loss.round_dp(2),
            profit_factor: profit_factor.round_dp(2),
            mean_risk_reward: mean_risk_reward.round_dp(2),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator as u64) / Decimal::from(denominator as u64)
}

fn mean(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetCategory, Direction, OrderKind};
    use chrono::Utc;

    fn trade(status: TradeStatus, pnl: Option<Decimal>, rr: Decimal) -> Trade {
        Trade {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            symbol: "EURUSD".to_string(),
            direction: Direction::Buy,
            kind: OrderKind::Market,
            entry: dec!(1.0900),
            stop_loss: dec!(1.0880),
            take_profit: dec!(1.0950),
            targets: vec![],
            quantity: dec!(0.10),
            category: AssetCategory::Forex,
            confidence: None,
            risk_reward: rr,
            status,
            ticket: None,
            exit_price: None,
            closed_at: None,
            pnl,
            pnl_percent: pnl.map(|p| p * dec!(10)),
        }
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let trades = vec![
            trade(TradeStatus::Closed, Some(dec!(10)), dec!(2)),
            trade(TradeStatus::Closed, Some(dec!(6)), dec!(2)),
            trade(TradeStatus::Closed, Some(dec!(-4)), dec!(1)),
            trade(TradeStatus::Open, None, dec!(3)),
        ];

        let stats = TradeStats::compute(&trades);
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.closed_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.win_rate, dec!(66.67));
        assert_eq!(stats.total_pnl, dec!(12));
        assert_eq!(stats.profit_factor, dec!(4));
        assert_eq!(stats.largest_win, dec!(10));
        assert_eq!(stats.largest_loss, dec!(-4));
        // Mean risk-reward covers all four trades, not just closed ones.
        assert_eq!(stats.mean_risk_reward, dec!(2));
    }

    #[test]
    fn profit_factor_saturates_without_losses() {
        let trades = vec![trade(TradeStatus::Closed, Some(dec!(10)), dec!(2))];
        let stats = TradeStats::compute(&trades);
        assert_eq!(stats.profit_factor, dec!(999));
    }

    #[test]
    fn empty_set_is_all_zeroes() {
        let stats = TradeStats::compute(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, Decimal::ZERO);
        assert_eq!(stats.profit_factor, Decimal::ZERO);
    }
}
