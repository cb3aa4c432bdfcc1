//! Human-readable message rendering for pipeline notifications.

use rust_decimal::Decimal;

use crate::models::{Alert, Trade};
use crate::signal::Grade;

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn opt_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "-".to_string(), |p| p.to_string())
}

/// Alert rejected because its confidence fell below the threshold.
#[must_use]
pub fn low_confidence(alert: &Alert, confidence: f64, threshold: f64, grade: Grade) -> String {
    format!(
        "*LOW CONFIDENCE ALERT REJECTED*\n\n\
         Asset: {}\n\
         Signal: {}\n\
         Confidence: {}\n\
         Threshold: {}\n\
         Grade: {}\n\n\
         Status: NOT EXECUTED",
        alert.symbol,
        alert.direction,
        percent(confidence),
        percent(threshold),
        grade,
    )
}

/// Valid alert received while the kill-switch is off.
#[must_use]
pub fn trading_disabled(alert: &Alert, confidence: f64) -> String {
    format!(
        "*ALERT RECEIVED (TRADING DISABLED)*\n\n\
         Asset: {}\n\
         Signal: {}\n\
         Entry: {}\n\
         SL: {}\n\
         TP: {}\n\
         Confidence: {}\n\n\
         Status: NOT EXECUTED",
        alert.symbol,
        alert.direction,
        opt_price(alert.entry),
        opt_price(alert.stop_loss),
        opt_price(alert.take_profit),
        percent(confidence),
    )
}

/// Valid alert received while the bot is disarmed.
#[must_use]
pub fn disarmed(alert: &Alert, confidence: f64) -> String {
    format!(
        "*ALERT RECEIVED (BOT DISARMED)*\n\n\
         Asset: {}\n\
         Signal: {}\n\
         Entry: {}\n\
         SL: {}\n\
         TP: {}\n\
         Confidence: {}\n\n\
         Status: WAITING FOR ARM",
        alert.symbol,
        alert.direction,
        opt_price(alert.entry),
        opt_price(alert.stop_loss),
        opt_price(alert.take_profit),
        percent(confidence),
    )
}

/// Close signal handled; reports how many positions were flattened.
#[must_use]
pub fn close_signal(symbol: &str, closed: usize, confidence: f64) -> String {
    format!(
        "*CLOSE SIGNAL RECEIVED*\n\n\
         Asset: {symbol}\n\
         Positions closed: {closed}\n\
         Confidence: {}",
        percent(confidence),
    )
}

/// Alert passed every gate but the broker rejected the order.
#[must_use]
pub fn execution_failed(symbol: &str, direction: &str, reason: &str, confidence: Option<f64>) -> String {
    let confidence = confidence.map_or_else(|| "-".to_string(), percent);
    format!(
        "*ALERT EXECUTION FAILED*\n\n\
         Asset: {symbol}\n\
         Signal: {direction}\n\
         Reason: {reason}\n\
         Confidence: {confidence}",
    )
}

/// Trade placed and live.
#[must_use]
pub fn trade_opened(trade: &Trade, grade: Option<Grade>) -> String {
    let grade = grade.map_or_else(|| "-".to_string(), |g| g.to_string());
    let confidence = trade.confidence.map_or_else(|| "-".to_string(), percent);
    format!(
        "*TRADE EXECUTED* {}\n\n\
         Asset: {}\n\
         Entry: {}\n\
         SL: {}\n\
         TP: {}\n\
         Lot Size: {}\n\
         R:R: 1:{:.2}\n\
         Confidence: {confidence}\n\
         Grade: {grade}\n\
         Trade ID: `{}`\n\n\
         Status: LIVE",
        trade.direction,
        trade.symbol,
        trade.entry,
        trade.stop_loss,
        trade.take_profit,
        trade.quantity,
        trade.risk_reward,
        trade.id,
    )
}

/// Live position levels updated via the modify command.
#[must_use]
pub fn position_modified(ticket: i64, sl: Decimal, tp: Decimal) -> String {
    format!(
        "*POSITION MODIFIED*\n\n\
         Ticket: `{ticket}`\n\
         New SL: {sl}\n\
         New TP: {tp}",
    )
}

/// Modify command refused by the bridge or by policy.
#[must_use]
pub fn modify_failed(ticket: i64, reason: &str) -> String {
    format!(
        "*MODIFY FAILED*\n\n\
         Ticket: `{ticket}`\n\
         Reason: {reason}",
    )
}

/// Trade closed with a realized result.
#[must_use]
pub fn trade_closed(trade: &Trade) -> String {
    format!(
        "*TRADE CLOSED*\n\n\
         Asset: {}\n\
         Signal: {}\n\
         Entry: {}\n\
         Exit: {}\n\
         Lot Size: {}\n\
         P&L: {}\n\
         P&L %: {}\n\
         Trade ID: `{}`",
        trade.symbol,
        trade.direction,
        trade.entry,
        opt_price(trade.exit_price),
        trade.quantity,
        opt_price(trade.pnl),
        opt_price(trade.pnl_percent),
        trade.id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertDirection, AlertOrigin, AssetCategory};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn alert() -> Alert {
        Alert {
            symbol: "EURUSD".to_string(),
            direction: AlertDirection::Buy,
            category: AssetCategory::Forex,
            entry: Some(dec!(1.0900)),
            entry_zone: None,
            stop_loss: Some(dec!(1.0880)),
            take_profit: Some(dec!(1.0950)),
            targets: vec![],
            origin: AlertOrigin::Provider,
            raw_text: String::new(),
            parsed_at: Utc::now(),
        }
    }

    #[test]
    fn low_confidence_reports_both_percentages() {
        let text = low_confidence(&alert(), 0.50, 0.65, Grade::D);
        assert!(text.contains("50.0%"));
        assert!(text.contains("65.0%"));
        assert!(text.contains("NOT EXECUTED"));
    }

    #[test]
    fn disarmed_reports_parsed_levels() {
        let text = disarmed(&alert(), 0.72);
        assert!(text.contains("WAITING FOR ARM"));
        assert!(text.contains("1.0900"));
        assert!(text.contains("1.0880"));
    }
}
