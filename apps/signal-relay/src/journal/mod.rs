//! Durable, queryable trade ledger.
//!
//! An in-memory index over every trade ever created, backed by two flat
//! files regenerated on every mutation: a CSV table for spreadsheets and a
//! JSONL log (one full record per line) the index is restored from at
//! startup. Independent of the open-trade cache and its eviction.

mod stats;

pub use stats::TradeStats;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Direction, Trade, TradeStatus};

/// Filter over journal queries. Every field is optional; `None` matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    /// Match a status.
    pub status: Option<TradeStatus>,
    /// Match a symbol.
    pub symbol: Option<String>,
    /// Match a direction.
    pub direction: Option<Direction>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to: Option<DateTime<Utc>>,
    /// Realized PnL at least this.
    pub min_pnl: Option<Decimal>,
    /// Realized PnL at most this.
    pub max_pnl: Option<Decimal>,
}

impl TradeFilter {
    fn matches(&self, trade: &Trade) -> bool {
        if self.status.is_some_and(|s| trade.status != s) {
            return false;
        }
        if self.symbol.as_deref().is_some_and(|s| trade.symbol != s) {
            return false;
        }
        if self.direction.is_some_and(|d| trade.direction != d) {
            return false;
        }
        if self.from.is_some_and(|t| trade.created_at < t) {
            return false;
        }
        if self.to.is_some_and(|t| trade.created_at > t) {
            return false;
        }
        if let Some(min) = self.min_pnl {
            if trade.pnl.is_none_or(|p| p < min) {
                return false;
            }
        }
        if let Some(max) = self.max_pnl {
            if trade.pnl.is_none_or(|p| p > max) {
                return false;
            }
        }
        true
    }
}

/// The trade ledger.
#[derive(Debug)]
pub struct Journal {
    trades: RwLock<HashMap<String, Trade>>,
    csv_path: PathBuf,
    jsonl_path: PathBuf,
    persist: bool,
}

impl Journal {
    /// Create a journal writing to the given export paths.
    #[must_use]
    pub fn new(csv_path: impl Into<PathBuf>, jsonl_path: impl Into<PathBuf>, persist: bool) -> Self {
        let journal = Self {
            trades: RwLock::new(HashMap::new()),
            csv_path: csv_path.into(),
            jsonl_path: jsonl_path.into(),
            persist,
        };
        journal.load();
        journal
    }

    /// An in-memory journal that never touches disk. Used in tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            trades: RwLock::new(HashMap::new()),
            csv_path: PathBuf::new(),
            jsonl_path: PathBuf::new(),
            persist: false,
        }
    }

    /// Insert or update a trade and regenerate both exports.
    pub fn upsert(&self, trade: Trade) {
        if let Ok(mut trades) = self.trades.write() {
            trades.insert(trade.id.clone(), trade);
        }
        self.save();
    }

    /// Fetch a trade by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Trade> {
        self.trades.read().ok()?.get(id).cloned()
    }

    /// Every trade, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<Trade> {
        let Ok(trades) = self.trades.read() else {
            return Vec::new();
        };
        let mut all: Vec<Trade> = trades.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Trades matching a filter, newest first.
    #[must_use]
    pub fn filter(&self, filter: &TradeFilter) -> Vec<Trade> {
        self.all().into_iter().filter(|t| filter.matches(t)).collect()
    }

    /// Trades still occupying a symbol slot, newest first.
    #[must_use]
    pub fn active(&self) -> Vec<Trade> {
        self.all().into_iter().filter(|t| t.status.is_active()).collect()
    }

    /// Aggregate statistics over every trade in the journal.
    #[must_use]
    pub fn stats(&self) -> TradeStats {
        TradeStats::compute(&self.all())
    }

    /// Realized PnL per calendar day (UTC), keyed `YYYY-MM-DD`.
    #[must_use]
    pub fn daily_pnl(&self) -> HashMap<String, Decimal> {
        let mut by_day: HashMap<String, Decimal> = HashMap::new();
        for trade in self.all() {
            if trade.status != TradeStatus::Closed {
                continue;
            }
            let Some(pnl) = trade.pnl else { continue };
            let day = trade.created_at.format("%Y-%m-%d").to_string();
            *by_day.entry(day).or_default() += pnl;
        }
        by_day
    }

    /// Per-month statistics, keyed `YYYY-MM`.
    #[must_use]
    pub fn monthly_summary(&self) -> HashMap<String, TradeStats> {
        let mut by_month: HashMap<String, Vec<Trade>> = HashMap::new();
        for trade in self.all() {
            let month = trade.created_at.format("%Y-%m").to_string();
            by_month.entry(month).or_default().push(trade);
        }
        by_month
            .into_iter()
            .map(|(month, trades)| (month, TradeStats::compute(&trades)))
            .collect()
    }

    /// Render trades as the flat CSV export.
    ///
    /// Fixed column order: id, timestamp, symbol, direction, kind, entry,
    /// stop, tp, targets, quantity, status, exit, pnl, pnl%, risk-reward.
    #[must_use]
    pub fn export_csv(trades: &[Trade]) -> String {
        let header = "id,timestamp,symbol,direction,kind,entry,stop_loss,take_profit,targets,quantity,status,exit_price,pnl,pnl_percent,risk_reward";
        let mut lines = vec![header.to_string()];

        for t in trades {
            let targets = t
                .targets
                .iter()
                .map(|tp| format!("{} {}", tp.label, tp.value))
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                t.id,
                t.created_at.to_rfc3339(),
                t.symbol,
                t.direction,
                t.kind,
                t.entry,
                t.stop_loss,
                t.take_profit,
                targets,
                t.quantity,
                t.status,
                opt(t.exit_price),
                opt(t.pnl),
                opt(t.pnl_percent),
                t.risk_reward,
            ));
        }

        lines.join("\n")
    }

    /// Render trades as the line-delimited structured export.
    #[must_use]
    pub fn export_jsonl(trades: &[Trade]) -> String {
        trades
            .iter()
            .filter_map(|t| serde_json::to_string(t).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Regenerate both export files from the index.
    fn save(&self) {
        if !self.persist {
            return;
        }
        let trades = self.all();

        if let Err(e) = std::fs::write(&self.jsonl_path, Self::export_jsonl(&trades)) {
            tracing::warn!(error = %e, path = %self.jsonl_path.display(), "Journal JSONL write failed");
        }
        if let Err(e) = std::fs::write(&self.csv_path, Self::export_csv(&trades)) {
            tracing::warn!(error = %e, path = %self.csv_path.display(), "Journal CSV write failed");
        }
    }

    /// Restore the index from the JSONL export.
    fn load(&self) {
        if !self.persist || !self.jsonl_path.exists() {
            return;
        }

        let Ok(content) = std::fs::read_to_string(&self.jsonl_path) else {
            tracing::warn!(path = %self.jsonl_path.display(), "Journal JSONL unreadable");
            return;
        };

        let Ok(mut trades) = self.trades.write() else {
            return;
        };
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<Trade>(line) {
                Ok(trade) => {
                    trades.insert(trade.id.clone(), trade);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable journal line");
                }
            }
        }
        tracing::info!(count = trades.len(), "Journal restored");
    }
}

fn opt(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetCategory, OrderKind};
    use rust_decimal_macros::dec;

    fn trade(id: &str, symbol: &str, status: TradeStatus, pnl: Option<Decimal>) -> Trade {
        Trade {
            id: id.to_string(),
            created_at: Utc::now(),
            symbol: symbol.to_string(),
            direction: Direction::Buy,
            kind: OrderKind::Market,
            entry: dec!(1.0900),
            stop_loss: dec!(1.0880),
            take_profit: dec!(1.0950),
            targets: vec![],
            quantity: dec!(0.10),
            category: AssetCategory::Forex,
            confidence: Some(0.7),
            risk_reward: dec!(2.5),
            status,
            ticket: None,
            exit_price: None,
            closed_at: None,
            pnl,
            pnl_percent: None,
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let journal = Journal::in_memory();
        journal.upsert(trade("t-1", "EURUSD", TradeStatus::Open, None));
        journal.upsert(trade("t-1", "EURUSD", TradeStatus::Closed, Some(dec!(5))));

        assert_eq!(journal.all().len(), 1);
        assert_eq!(journal.get("t-1").unwrap().status, TradeStatus::Closed);
    }

    #[test]
    fn filter_by_status_symbol_and_pnl() {
        let journal = Journal::in_memory();
        journal.upsert(trade("t-1", "EURUSD", TradeStatus::Closed, Some(dec!(10))));
        journal.upsert(trade("t-2", "EURUSD", TradeStatus::Closed, Some(dec!(-4))));
        journal.upsert(trade("t-3", "GBPUSD", TradeStatus::Open, None));

        let closed_eur = journal.filter(&TradeFilter {
            status: Some(TradeStatus::Closed),
            symbol: Some("EURUSD".to_string()),
            ..Default::default()
        });
        assert_eq!(closed_eur.len(), 2);

        let winners = journal.filter(&TradeFilter {
            min_pnl: Some(Decimal::ZERO),
            ..Default::default()
        });
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].id, "t-1");
    }

    #[test]
    fn csv_export_has_fixed_columns() {
        let trades = vec![trade("t-1", "EURUSD", TradeStatus::Open, None)];
        let csv = Journal::export_csv(&trades);
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("id,timestamp,symbol,direction"));
        assert_eq!(header.split(',').count(), 15);

        let row = lines.next().unwrap();
        assert!(row.contains("EURUSD"));
        assert!(row.contains("OPEN"));
        assert_eq!(row.split(',').count(), 15);
    }

    #[test]
    fn jsonl_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("journal.csv");
        let jsonl = dir.path().join("journal.jsonl");

        {
            let journal = Journal::new(&csv, &jsonl, true);
            journal.upsert(trade("t-1", "EURUSD", TradeStatus::Closed, Some(dec!(5))));
            journal.upsert(trade("t-2", "GBPUSD", TradeStatus::Open, None));
        }

        let restored = Journal::new(&csv, &jsonl, true);
        assert_eq!(restored.all().len(), 2);
        assert_eq!(restored.get("t-1").unwrap().pnl, Some(dec!(5)));
        assert!(csv.exists());
    }

    #[test]
    fn monthly_summary_groups_by_creation_month() {
        let journal = Journal::in_memory();
        journal.upsert(trade("t-1", "EURUSD", TradeStatus::Closed, Some(dec!(10))));
        journal.upsert(trade("t-2", "GBPUSD", TradeStatus::Closed, Some(dec!(-5))));

        let summary = journal.monthly_summary();
        let month = Utc::now().format("%Y-%m").to_string();
        let stats = summary.get(&month).unwrap();
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.total_pnl, dec!(5));
    }

    #[test]
    fn daily_pnl_buckets_closed_trades() {
        let journal = Journal::in_memory();
        journal.upsert(trade("t-1", "EURUSD", TradeStatus::Closed, Some(dec!(10))));
        journal.upsert(trade("t-2", "GBPUSD", TradeStatus::Closed, Some(dec!(-3))));
        journal.upsert(trade("t-3", "XAUUSD", TradeStatus::Open, None));

        let daily = journal.daily_pnl();
        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(daily.get(&today), Some(&dec!(7)));
    }
}
