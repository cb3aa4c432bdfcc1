//! Read-only account view fetched from the broker bridge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of the trading account.
///
/// Fetched from the execution gateway on demand and never cached longer
/// than the single computation that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account login number.
    pub login: i64,
    /// Account currency code.
    pub currency: String,
    /// Account balance.
    pub balance: Decimal,
    /// Account equity.
    pub equity: Decimal,
    /// Margin in use.
    pub margin: Decimal,
    /// Free margin (balance minus margin).
    pub free_margin: Decimal,
    /// Account leverage.
    pub leverage: i64,
    /// Number of open positions.
    pub open_positions: u32,
}
