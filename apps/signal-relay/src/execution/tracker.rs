//! Per-symbol concurrency guard over open trades.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{Trade, TradeStatus};

/// Why a new trade was refused before reaching the broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerRejection {
    /// The global cap on simultaneously active trades is reached.
    #[error("max open trades ({max}) reached")]
    MaxOpenTrades {
        /// Configured cap.
        max: usize,
    },
    /// The symbol already has an active trade.
    #[error("already {count} open trade(s) on {symbol}")]
    SymbolBusy {
        /// The busy symbol.
        symbol: String,
        /// Active trades on it.
        count: usize,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    status: TradeStatus,
    tracked_at: DateTime<Utc>,
}

/// Bounded, time-expiring cache of active trades per symbol.
///
/// The guard and the cache are one structure behind one lock so that
/// guard-then-track is atomic: two concurrent alerts for the same symbol
/// cannot both pass the check. Entries older than the retention window are
/// evicted on access even if never closed. This bounds memory growth; it is not a
/// business rule.
#[derive(Debug)]
pub struct TradeTracker {
    inner: Mutex<HashMap<String, Vec<Entry>>>,
    max_open: usize,
    retention: Duration,
}

impl TradeTracker {
    /// Create a tracker with the given cap and retention window.
    #[must_use]
    pub fn new(max_open: usize, retention_secs: i64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_open,
            retention: Duration::seconds(retention_secs),
        }
    }

    /// Atomically run the concurrency checks and track the trade.
    ///
    /// This is the entry point the pipeline uses; [`Self::can_open`] and
    /// [`Self::track`] exist separately for callers that only need one half.
    pub fn reserve(&self, trade: &Trade) -> Result<(), TrackerRejection> {
        let Ok(mut inner) = self.inner.lock() else {
            return Ok(());
        };
        let now = Utc::now();
        Self::evict_expired(&mut inner, now, self.retention);

        Self::check(&inner, &trade.symbol, self.max_open)?;
        inner.entry(trade.symbol.clone()).or_default().push(Entry {
            id: trade.id.clone(),
            status: trade.status,
            tracked_at: now,
        });
        Ok(())
    }

    /// Whether a new trade on `symbol` would pass the concurrency checks.
    pub fn can_open(&self, symbol: &str) -> Result<(), TrackerRejection> {
        let Ok(mut inner) = self.inner.lock() else {
            return Ok(());
        };
        Self::evict_expired(&mut inner, Utc::now(), self.retention);
        Self::check(&inner, symbol, self.max_open)
    }

    /// Track a trade without running the checks.
    pub fn track(&self, trade: &Trade) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entry(trade.symbol.clone()).or_default().push(Entry {
                id: trade.id.clone(),
                status: trade.status,
                tracked_at: Utc::now(),
            });
        }
    }

    /// Update the cached status of a tracked trade.
    ///
    /// Terminal statuses release the symbol slot.
    pub fn mark_status(&self, symbol: &str, id: &str, status: TradeStatus) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(entries) = inner.get_mut(symbol) {
                for entry in entries.iter_mut() {
                    if entry.id == id {
                        entry.status = status;
                    }
                }
            }
        }
    }

    /// Number of active trades across all symbols.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        Self::evict_expired(&mut inner, Utc::now(), self.retention);
        inner
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.status.is_active())
            .count()
    }

    fn check(
        inner: &HashMap<String, Vec<Entry>>,
        symbol: &str,
        max_open: usize,
    ) -> Result<(), TrackerRejection> {
        let total_active: usize = inner
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.status.is_active())
            .count();
        if total_active >= max_open {
            return Err(TrackerRejection::MaxOpenTrades { max: max_open });
        }

        let on_symbol = inner
            .get(symbol)
            .map_or(0, |entries| entries.iter().filter(|e| e.status.is_active()).count());
        if on_symbol > 0 {
            return Err(TrackerRejection::SymbolBusy {
                symbol: symbol.to_string(),
                count: on_symbol,
            });
        }

        Ok(())
    }

    fn evict_expired(
        inner: &mut HashMap<String, Vec<Entry>>,
        now: DateTime<Utc>,
        retention: Duration,
    ) {
        for entries in inner.values_mut() {
            entries.retain(|e| now - e.tracked_at <= retention);
        }
        inner.retain(|_, entries| !entries.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetCategory, Direction, OrderKind};
    use rust_decimal_macros::dec;

    fn trade(id: &str, symbol: &str, status: TradeStatus) -> Trade {
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
            confidence: None,
            risk_reward: dec!(2.5),
            status,
            ticket: None,
            exit_price: None,
            closed_at: None,
            pnl: None,
            pnl_percent: None,
        }
    }

    #[test]
    fn symbol_exclusivity_holds_while_active() {
        let tracker = TradeTracker::new(5, 3600);

        tracker.reserve(&trade("t-1", "EURUSD", TradeStatus::Open)).unwrap();

        let second = tracker.reserve(&trade("t-2", "EURUSD", TradeStatus::Open));
        assert!(matches!(second, Err(TrackerRejection::SymbolBusy { .. })));

        // A different symbol is fine.
        tracker.reserve(&trade("t-3", "GBPUSD", TradeStatus::Open)).unwrap();
    }

    #[test]
    fn terminal_status_releases_the_slot() {
        let tracker = TradeTracker::new(5, 3600);

        tracker.reserve(&trade("t-1", "EURUSD", TradeStatus::Open)).unwrap();
        tracker.mark_status("EURUSD", "t-1", TradeStatus::Closed);

        tracker.reserve(&trade("t-2", "EURUSD", TradeStatus::Open)).unwrap();
    }

    #[test]
    fn global_cap_applies_across_symbols() {
        let tracker = TradeTracker::new(2, 3600);

        tracker.reserve(&trade("t-1", "EURUSD", TradeStatus::Open)).unwrap();
        tracker.reserve(&trade("t-2", "GBPUSD", TradeStatus::Pending)).unwrap();

        let third = tracker.reserve(&trade("t-3", "XAUUSD", TradeStatus::Open));
        assert_eq!(third, Err(TrackerRejection::MaxOpenTrades { max: 2 }));
    }

    #[test]
    fn pending_counts_as_active() {
        let tracker = TradeTracker::new(5, 3600);

        tracker.reserve(&trade("t-1", "EURUSD", TradeStatus::Pending)).unwrap();
        let second = tracker.can_open("EURUSD");
        assert!(matches!(second, Err(TrackerRejection::SymbolBusy { .. })));
    }

    #[test]
    fn stale_entries_are_evicted() {
        let tracker = TradeTracker::new(5, 0);

        tracker.track(&trade("t-1", "EURUSD", TradeStatus::Open));
        // Retention of zero seconds expires the entry immediately.
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(tracker.can_open("EURUSD").is_ok());
        assert_eq!(tracker.active_count(), 0);
    }
}
