//! The signal-to-trade pipeline.
//!
//! One inbound event runs the full chain to completion: dedup, routing,
//! parsing, scoring, gates, risk sizing, concurrency guard, broker call,
//! journaling and notification. All shared state is owned here and passed
//! in at construction, nothing module-global. Internal failures are
//! converted to values at each component boundary; nothing escapes
//! [`Pipeline::handle_update`].

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;

use crate::config::Config;
use crate::events::{ChannelUpdate, IdempotencyGuard, RoutedEvent, route};
use crate::execution::{
    BrokerPort, CloseOutcome, ExecutionGateway, ModifyOutcome, PlaceOutcome, TradeTracker,
};
use crate::journal::Journal;
use crate::menu::{self, DraftOrder, SessionStore, Transition};
use crate::models::{Alert, AlertDirection, AlertOrigin, AssetCategory, Direction, OrderKind, TradeStatus};
use crate::notifier::{Notifier, OutgoingView, format};
use crate::risk::{OrderRequest, RiskEngine};
use crate::signal::{Grade, parse_alert, score_alert, validate_alert};

/// Application state: every pipeline component, explicitly owned.
///
/// Created once at process start, shared behind an `Arc` by the HTTP
/// server, torn down at shutdown.
pub struct Pipeline<B: BrokerPort, N: Notifier> {
    config: Config,
    dedup: IdempotencyGuard,
    sessions: SessionStore,
    tracker: TradeTracker,
    journal: Journal,
    gateway: ExecutionGateway<B>,
    notifier: N,
    risk: RiskEngine,
}

impl<B: BrokerPort, N: Notifier> Pipeline<B, N> {
    /// Wire the pipeline together from its components.
    #[must_use]
    pub fn new(config: Config, gateway: ExecutionGateway<B>, notifier: N, journal: Journal) -> Self {
        let dedup = IdempotencyGuard::new(config.dedup_max_entries);
        let sessions = SessionStore::new(config.session_ttl_secs);
        let tracker = TradeTracker::new(config.max_open_trades, config.open_trade_retention_secs);
        let risk = RiskEngine::new(config.risk.clone());

        Self {
            config,
            dedup,
            sessions,
            tracker,
            journal,
            gateway,
            notifier,
            risk,
        }
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The trade ledger.
    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The idempotency guard, exposed for the periodic sweep task.
    #[must_use]
    pub const fn dedup(&self) -> &IdempotencyGuard {
        &self.dedup
    }

    /// The menu session store, exposed for the periodic sweep task.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The execution gateway.
    #[must_use]
    pub const fn gateway(&self) -> &ExecutionGateway<B> {
        &self.gateway
    }

    /// Run one inbound event through the pipeline.
    ///
    /// Never fails: every outcome is a log line, a notification, or both.
    pub async fn handle_update(&self, update: ChannelUpdate) {
        if !self.dedup.check_and_mark(update.update_id) {
            tracing::debug!(update_id = update.update_id, "Duplicate event dropped");
            return;
        }

        let Some(event) = route(&update) else {
            tracing::debug!(update_id = update.update_id, "Unroutable event dropped");
            return;
        };

        match event {
            RoutedEvent::ChannelMessage {
                chat_id,
                chat_name,
                sender_id,
                text,
            } => {
                if let Some(operator_id) = sender_id {
                    if self.try_menu_reply(operator_id, &text).await {
                        return;
                    }
                }
                if self.try_modify_command(&text).await {
                    return;
                }
                self.handle_alert_text(chat_id, &chat_name, &text).await;
            }
            RoutedEvent::ChannelPost {
                chat_id,
                chat_name,
                text,
            } => {
                self.handle_alert_text(chat_id, &chat_name, &text).await;
            }
            RoutedEvent::ButtonAction { operator_id, data } => {
                self.handle_button(operator_id, &data).await;
            }
            RoutedEvent::EditedMessage { chat_id, .. } => {
                tracing::debug!(chat_id, "Edited message dropped");
            }
        }
    }

    /// Free-text numeric replies belong to the menu only while the
    /// operator's session step expects one. Returns true when consumed.
    async fn try_menu_reply(&self, operator_id: i64, text: &str) -> bool {
        let Ok(value) = Decimal::from_str(text.trim()) else {
            return false;
        };

        let now = Utc::now();
        let Some(session) = self.sessions.get(operator_id, now) else {
            return false;
        };
        if !session.step.expects_numeric() {
            return false;
        }

        let transition = menu::apply_reply(session, value, now);
        self.apply_transition(operator_id, transition).await;
        true
    }

    /// Operator command to move stop/target on a live ticket:
    /// `MODIFY <ticket> SL <price> TP <price>`. Returns true when consumed.
    async fn try_modify_command(&self, text: &str) -> bool {
        let Some((ticket, sl, tp)) = parse_modify_command(text) else {
            return false;
        };

        if !self.config.allow_trading {
            self.notifier
                .send(&format::modify_failed(ticket, "trading is disabled"))
                .await;
            return true;
        }

        match self.gateway.modify_position(ticket, sl, tp).await {
            ModifyOutcome::Modified => {
                // Mirror the new levels onto the journaled trade.
                if let Some(mut trade) = self
                    .journal
                    .active()
                    .into_iter()
                    .find(|t| t.ticket == Some(ticket))
                {
                    trade.stop_loss = sl;
                    trade.take_profit = tp;
                    self.journal.upsert(trade);
                }
                tracing::info!(ticket, "Position modified");
                self.notifier
                    .send(&format::position_modified(ticket, sl, tp))
                    .await;
            }
            ModifyOutcome::Rejected { message } => {
                tracing::warn!(ticket, %message, "Modify rejected");
                self.notifier
                    .send(&format::modify_failed(ticket, &message))
                    .await;
            }
        }
        true
    }

    /// Drive the menu state machine from a button press.
    async fn handle_button(&self, operator_id: i64, data: &str) {
        let Some(action) = menu::parse_action(data) else {
            tracing::debug!(operator_id, data, "Unknown button action dropped");
            return;
        };

        let now = Utc::now();
        let session = self.sessions.get(operator_id, now);
        let transition = menu::apply_action(session, operator_id, action, now);
        self.apply_transition(operator_id, transition).await;
    }

    async fn apply_transition(&self, operator_id: i64, transition: Transition) {
        match transition {
            Transition::Continue { session, view } => {
                self.sessions.put(session);
                self.notifier.send_view(&view).await;
            }
            Transition::Execute { draft } => {
                self.sessions.remove(operator_id);
                self.execute_draft(draft).await;
            }
            Transition::Cancelled { view } => {
                self.sessions.remove(operator_id);
                self.notifier.send_view(&view).await;
            }
            Transition::Ignored => {}
        }
    }

    /// Execute an operator-confirmed draft as a market order.
    async fn execute_draft(&self, draft: DraftOrder) {
        if !self.config.allow_trading {
            self.notifier
                .send(&format::execution_failed(
                    &draft.symbol,
                    &draft.direction.to_string(),
                    "trading is disabled",
                    None,
                ))
                .await;
            return;
        }

        let category = crate::signal::categorize_symbol(&draft.symbol)
            .unwrap_or(AssetCategory::Forex);
        let request = OrderRequest {
            symbol: draft.symbol.clone(),
            direction: draft.direction,
            kind: OrderKind::Market,
            entry: draft.effective_entry(),
            stop: draft.effective_stop(),
            target: draft.target,
            targets: vec![],
            category,
            confidence: None,
        };

        self.execute_order(request, None).await;
    }

    /// The channel-alert path: parse, score, gate, execute.
    async fn handle_alert_text(&self, chat_id: i64, chat_name: &str, text: &str) {
        if let Some(provider_id) = self.config.provider_group_id {
            if chat_id != provider_id {
                tracing::debug!(chat_id, "Message from non-provider chat ignored");
                return;
            }
        }

        tracing::info!(chat = chat_name, text = %truncate(text, 50), "Alert received");

        let alert = match parse_alert(text, AlertOrigin::Provider)
            .and_then(|alert| validate_alert(&alert).map(|()| alert))
        {
            Ok(alert) => alert,
            Err(rejection) => {
                tracing::warn!(%rejection, "Alert rejected");
                return;
            }
        };

        let score = score_alert(&alert);
        tracing::info!(
            symbol = %alert.symbol,
            direction = %alert.direction,
            grade = %score.grade,
            confidence = score.confidence,
            "Alert scored"
        );

        // Close alerts carry no price levels, so the price-calibrated
        // confidence bands do not apply to them.
        if alert.direction != AlertDirection::Close
            && score.confidence < self.config.min_confidence
        {
            self.notifier
                .send(&format::low_confidence(
                    &alert,
                    score.confidence,
                    self.config.min_confidence,
                    score.grade,
                ))
                .await;
            return;
        }

        // Policy gates: surface the parsed levels so a human can act on
        // the signal manually.
        if !self.config.allow_trading {
            self.notifier
                .send(&format::trading_disabled(&alert, score.confidence))
                .await;
            return;
        }

        if !self.config.armed {
            let text = format::disarmed(&alert, score.confidence);
            let view = menu::views::review_keyboard(&alert)
                .map_or_else(|| OutgoingView::text(text.clone()), |kb| {
                    OutgoingView::with_keyboard(text.clone(), kb)
                });
            self.notifier.send_view(&view).await;
            return;
        }

        if alert.direction == AlertDirection::Close {
            self.handle_close(&alert, score.confidence).await;
            return;
        }

        let direction = match alert.direction {
            AlertDirection::Buy => Direction::Buy,
            AlertDirection::Sell => Direction::Sell,
            AlertDirection::Close => return,
        };
        let (Some(entry), Some(stop), Some(target)) =
            (alert.entry, alert.stop_loss, alert.take_profit)
        else {
            // Validation guarantees these for Buy/Sell.
            return;
        };

        let request = OrderRequest {
            symbol: alert.symbol.clone(),
            direction,
            kind: OrderKind::Market,
            entry,
            stop,
            target,
            targets: alert.targets.clone(),
            category: alert.category,
            confidence: Some(score.confidence),
        };

        self.execute_order(request, Some(score.grade)).await;
    }

    /// Shared tail of both execution paths: size, guard, place, record.
    async fn execute_order(&self, request: OrderRequest, grade: Option<Grade>) {
        let balance = match self.gateway.account_snapshot().await {
            Some(snapshot) => snapshot.balance,
            None => self.config.account_balance,
        };

        let mut trade = match self.risk.build_order(&request, balance) {
            Ok(trade) => trade,
            Err(rejection) => {
                tracing::warn!(symbol = %request.symbol, %rejection, "Order rejected by risk engine");
                self.notifier
                    .send(&format::execution_failed(
                        &request.symbol,
                        &request.direction.to_string(),
                        &rejection.to_string(),
                        request.confidence,
                    ))
                    .await;
                return;
            }
        };

        if let Err(rejection) = self.tracker.reserve(&trade) {
            tracing::warn!(symbol = %trade.symbol, %rejection, "Order rejected by concurrency guard");
            self.notifier
                .send(&format::execution_failed(
                    &trade.symbol,
                    &trade.direction.to_string(),
                    &rejection.to_string(),
                    trade.confidence,
                ))
                .await;
            return;
        }

        match self.gateway.place_order(&mut trade).await {
            PlaceOutcome::Placed { .. } => {
                self.tracker
                    .mark_status(&trade.symbol, &trade.id, trade.status);
                self.journal.upsert(trade.clone());
                self.notifier.send(&format::trade_opened(&trade, grade)).await;
            }
            PlaceOutcome::Rejected { message } => {
                self.tracker
                    .mark_status(&trade.symbol, &trade.id, TradeStatus::Error);
                self.journal.upsert(trade.clone());
                self.notifier
                    .send(&format::execution_failed(
                        &trade.symbol,
                        &trade.direction.to_string(),
                        &message,
                        trade.confidence,
                    ))
                    .await;
            }
        }
    }

    /// Flatten journaled positions matching a Close alert.
    async fn handle_close(&self, alert: &Alert, confidence: f64) {
        let open: Vec<_> = self
            .journal
            .active()
            .into_iter()
            .filter(|t| t.symbol == alert.symbol && t.ticket.is_some())
            .collect();

        let mut closed = 0usize;
        for trade in open {
            let Some(ticket) = trade.ticket else { continue };
            match self.gateway.close_position(ticket).await {
                CloseOutcome::Closed { exit_price } => {
                    let updated = trade.close(exit_price, Utc::now());
                    self.tracker
                        .mark_status(&updated.symbol, &updated.id, updated.status);
                    self.notifier.send(&format::trade_closed(&updated)).await;
                    self.journal.upsert(updated);
                    closed += 1;
                }
                CloseOutcome::NotFound => {
                    tracing::warn!(ticket, "Position already gone at the bridge");
                }
                CloseOutcome::Rejected { message } => {
                    tracing::warn!(ticket, %message, "Close rejected");
                }
            }
        }

        self.notifier
            .send(&format::close_signal(&alert.symbol, closed, confidence))
            .await;
    }
}

#[allow(clippy::expect_used)] // Regex is a compile-time constant.
static MODIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*MODIFY\s+(\d+)\s+SL:?\s*([\d.]+)\s+TP:?\s*([\d.]+)\s*$")
        .expect("modify regex is valid")
});

/// Parse the operator modify command. `None` for anything else; the text
/// then falls through to the alert path.
fn parse_modify_command(text: &str) -> Option<(i64, Decimal, Decimal)> {
    let caps = MODIFY_RE.captures(text)?;
    let ticket = caps[1].parse().ok()?;
    let sl = Decimal::from_str(&caps[2]).ok()?;
    let tp = Decimal::from_str(&caps[3]).ok()?;
    Some((ticket, sl, tp))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_modify_command() {
        let (ticket, sl, tp) = parse_modify_command("MODIFY 555001 SL 1.0890 TP 1.0970").unwrap();
        assert_eq!(ticket, 555_001);
        assert_eq!(sl, dec!(1.0890));
        assert_eq!(tp, dec!(1.0970));
    }

    #[test]
    fn modify_command_tolerates_case_and_colons() {
        let parsed = parse_modify_command("  modify 7 sl: 1.05 tp: 1.10 ");
        assert_eq!(parsed, Some((7, dec!(1.05), dec!(1.10))));
    }

    #[test]
    fn non_commands_fall_through() {
        assert!(parse_modify_command("BUY EURUSD 1.0900 SL: 1.0880 TP: 1.0950").is_none());
        assert!(parse_modify_command("MODIFY SL 1.05 TP 1.10").is_none());
        assert!(parse_modify_command("1.0890").is_none());
    }
}
