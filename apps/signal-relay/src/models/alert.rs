//! Alert types produced by the signal parser.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction carried by an alert.
///
/// `Close` alerts carry no price fields and request that open positions on
/// the symbol be flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertDirection {
    /// Long entry signal.
    Buy,
    /// Short entry signal.
    Sell,
    /// Flatten open positions on the symbol.
    Close,
}

impl std::fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Close => write!(f, "CLOSE"),
        }
    }
}

/// Instrument category. Closed set; symbols outside it are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetCategory {
    /// Currency pairs.
    Forex,
    /// Crypto assets.
    Crypto,
    /// Equity indices.
    Indices,
    /// Metals and energy.
    Commodities,
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forex => write!(f, "FOREX"),
            Self::Crypto => write!(f, "CRYPTO"),
            Self::Indices => write!(f, "INDICES"),
            Self::Commodities => write!(f, "COMMODITIES"),
        }
    }
}

/// Which channel produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertOrigin {
    /// The VIP provider channel.
    Provider,
    /// The operator's interactive menu.
    Menu,
    /// Direct API submission.
    Api,
}

/// A price zone given instead of a single entry price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryZone {
    /// Lower bound of the zone.
    pub low: Decimal,
    /// Upper bound of the zone.
    pub high: Decimal,
}

/// One labeled take-profit target (TP1, TP2, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeProfitTarget {
    /// Label, e.g. "TP1".
    pub label: String,
    /// Target price.
    pub value: Decimal,
}

/// A structured trade signal derived from raw channel text.
///
/// Ephemeral: produced by the parser, consumed once by the pipeline. The
/// price-ordering invariant (Buy: stop < entry < targets; Sell: reverse) is
/// enforced by the validator before an alert reaches the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Instrument symbol, upper-cased.
    pub symbol: String,
    /// Signal direction.
    pub direction: AlertDirection,
    /// Instrument category derived from the symbol.
    pub category: AssetCategory,
    /// Entry price. `None` for Close alerts.
    pub entry: Option<Decimal>,
    /// Entry zone, when the alert gave a range instead of a price.
    pub entry_zone: Option<EntryZone>,
    /// Stop loss price.
    pub stop_loss: Option<Decimal>,
    /// Primary take-profit price (first target).
    pub take_profit: Option<Decimal>,
    /// All take-profit targets in order.
    pub targets: Vec<TakeProfitTarget>,
    /// Which channel produced this alert.
    pub origin: AlertOrigin,
    /// Raw message text the alert was parsed from.
    pub raw_text: String,
    /// When the alert was parsed.
    pub parsed_at: DateTime<Utc>,
}

impl Alert {
    /// Every take-profit price on this alert, primary first.
    pub fn target_prices(&self) -> Vec<Decimal> {
        if self.targets.is_empty() {
            self.take_profit.into_iter().collect()
        } else {
            self.targets.iter().map(|t| t.value).collect()
        }
    }
}
