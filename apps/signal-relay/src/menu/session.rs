//! Per-operator menu sessions and their TTL store.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Direction;

/// Where an operator is in the interactive order flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuStep {
    /// No screen open.
    Idle,
    /// Stop-loss screen open; a numeric reply sets the stop.
    AwaitingStopInput,
    /// Entry screen open; a numeric reply sets the entry limit.
    AwaitingEntryInput,
    /// Confirmation screen open; confirm or cancel.
    AwaitingConfirmation,
}

impl MenuStep {
    /// Whether a free-text numeric reply is meaningful at this step.
    #[must_use]
    pub const fn expects_numeric(&self) -> bool {
        matches!(self, Self::AwaitingStopInput | Self::AwaitingEntryInput)
    }
}

/// The order being constructed through the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    /// Instrument symbol.
    pub symbol: String,
    /// Trade direction.
    pub direction: Direction,
    /// Entry price from the originating alert.
    pub entry: Decimal,
    /// Stop loss from the originating alert.
    pub stop: Decimal,
    /// Take-profit target.
    pub target: Decimal,
    /// Operator override for the entry price.
    pub buy_limit: Option<Decimal>,
    /// Operator override for the stop loss.
    pub stop_limit: Option<Decimal>,
}

impl DraftOrder {
    /// Entry price after operator overrides.
    #[must_use]
    pub fn effective_entry(&self) -> Decimal {
        self.buy_limit.unwrap_or(self.entry)
    }

    /// Stop loss after operator overrides.
    #[must_use]
    pub fn effective_stop(&self) -> Decimal {
        self.stop_limit.unwrap_or(self.stop)
    }

    /// Risk-reward ratio of the draft as it currently stands.
    #[must_use]
    pub fn risk_reward(&self) -> Option<Decimal> {
        let entry = self.effective_entry();
        let risk = (entry - self.effective_stop()).abs();
        if risk.is_zero() {
            return None;
        }
        Some((self.target - entry).abs() / risk)
    }
}

/// One operator's ephemeral menu state. Single-writer: only that operator's
/// subsequent actions mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSession {
    /// Operator the session belongs to.
    pub operator_id: i64,
    /// Current step.
    pub step: MenuStep,
    /// Draft order under construction.
    pub draft: DraftOrder,
    /// Last time the operator touched the session.
    pub last_touched: DateTime<Utc>,
}

impl MenuSession {
    /// Start a session at the stop-loss screen.
    #[must_use]
    pub const fn begin(operator_id: i64, draft: DraftOrder, now: DateTime<Utc>) -> Self {
        Self {
            operator_id,
            step: MenuStep::AwaitingStopInput,
            draft,
            last_touched: now,
        }
    }
}

/// Keyed store of menu sessions with an explicit TTL.
///
/// Sessions are created lazily on the first interactive action and expire
/// after `ttl` of inactivity; expired sessions are dropped on access and by
/// [`SessionStore::purge_expired`].
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, MenuSession>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store with the given inactivity TTL in seconds.
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Fetch the operator's session, dropping it if it has expired.
    #[must_use]
    pub fn get(&self, operator_id: i64, now: DateTime<Utc>) -> Option<MenuSession> {
        let mut sessions = self.sessions.lock().ok()?;
        if let Some(session) = sessions.get(&operator_id) {
            if now - session.last_touched <= self.ttl {
                return Some(session.clone());
            }
        }
        sessions.remove(&operator_id);
        None
    }

    /// Store a session under its operator id.
    pub fn put(&self, session: MenuSession) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session.operator_id, session);
        }
    }

    /// Remove the operator's session, returning it if present.
    pub fn remove(&self, operator_id: i64) -> Option<MenuSession> {
        self.sessions.lock().ok()?.remove(&operator_id)
    }

    /// Drop every session idle past the TTL.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.retain(|_, session| now - session.last_touched <= self.ttl);
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> DraftOrder {
        DraftOrder {
            symbol: "EURUSD".to_string(),
            direction: Direction::Buy,
            entry: dec!(1.0900),
            stop: dec!(1.0880),
            target: dec!(1.0950),
            buy_limit: None,
            stop_limit: None,
        }
    }

    #[test]
    fn overrides_take_precedence() {
        let mut d = draft();
        assert_eq!(d.effective_entry(), dec!(1.0900));

        d.buy_limit = Some(dec!(1.0895));
        d.stop_limit = Some(dec!(1.0875));
        assert_eq!(d.effective_entry(), dec!(1.0895));
        assert_eq!(d.effective_stop(), dec!(1.0875));
    }

    #[test]
    fn risk_reward_reflects_overrides() {
        let d = draft();
        assert_eq!(d.risk_reward(), Some(dec!(2.5)));
    }

    #[test]
    fn expired_session_is_dropped_on_access() {
        let store = SessionStore::new(60);
        let now = Utc::now();
        store.put(MenuSession::begin(7, draft(), now - Duration::seconds(120)));

        assert!(store.get(7, now).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn live_session_round_trips() {
        let store = SessionStore::new(60);
        let now = Utc::now();
        store.put(MenuSession::begin(7, draft(), now));

        let session = store.get(7, now).unwrap();
        assert_eq!(session.step, MenuStep::AwaitingStopInput);
    }

    #[test]
    fn purge_drops_only_expired() {
        let store = SessionStore::new(60);
        let now = Utc::now();
        store.put(MenuSession::begin(1, draft(), now - Duration::seconds(120)));
        store.put(MenuSession::begin(2, draft(), now));

        store.purge_expired(now);
        assert_eq!(store.len(), 1);
        assert!(store.get(2, now).is_some());
    }
}
