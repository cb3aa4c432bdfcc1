//! Screen rendering for the interactive order menu.

use crate::models::{Alert, AlertDirection};
use crate::notifier::{InlineButton, InlineKeyboard, OutgoingView};

use super::session::DraftOrder;

/// Keyboard offering to build an order from a parsed alert.
///
/// Attached to alert notifications so the operator can pick the signal up
/// manually. Returns `None` for alerts without a complete price set.
#[must_use]
pub fn review_keyboard(alert: &Alert) -> Option<InlineKeyboard> {
    let direction = match alert.direction {
        AlertDirection::Buy => "BUY",
        AlertDirection::Sell => "SELL",
        AlertDirection::Close => return None,
    };
    let (entry, stop, target) = (alert.entry?, alert.stop_loss?, alert.take_profit?);

    Some(InlineKeyboard {
        inline_keyboard: vec![vec![InlineButton::new(
            "Customize & execute",
            format!("trade:{}:{direction}:{entry}:{stop}:{target}", alert.symbol),
        )]],
    })
}

/// Stop-loss screen.
#[must_use]
pub fn stop_menu(draft: &DraftOrder) -> OutgoingView {
    let text = format!(
        "*{} {}*\n\n\
         Entry: {}\n\
         Current SL: {}\n\
         TP: {}\n\n\
         *Step 1:* set your stop loss. Pick a preset or type a price.",
        draft.symbol,
        draft.direction,
        draft.effective_entry(),
        draft.effective_stop(),
        draft.target,
    );

    let keyboard = InlineKeyboard {
        inline_keyboard: vec![
            vec![
                InlineButton::new("Use default SL", "stop:default"),
                InlineButton::new("+5 pips", "stop:plus5"),
            ],
            vec![
                InlineButton::new("+10 pips", "stop:plus10"),
                InlineButton::new("Tight (-5)", "stop:minus5"),
            ],
            vec![InlineButton::new("Cancel", "exec:cancel")],
        ],
    };

    OutgoingView::with_keyboard(text, keyboard)
}

/// Entry screen.
#[must_use]
pub fn entry_menu(draft: &DraftOrder) -> OutgoingView {
    let text = format!(
        "*{} {}*\n\n\
         Alert entry: {}\n\
         Your entry: {}\n\n\
         *Step 2:* set your entry limit. Pick a preset or type a price.",
        draft.symbol,
        draft.direction,
        draft.entry,
        draft.effective_entry(),
    );

    let keyboard = InlineKeyboard {
        inline_keyboard: vec![
            vec![
                InlineButton::new("Use alert entry", "entry:current"),
                InlineButton::new("-2%", "entry:minus2"),
            ],
            vec![
                InlineButton::new("-1%", "entry:minus1"),
                InlineButton::new("+1%", "entry:plus1"),
            ],
            vec![InlineButton::new("Cancel", "exec:cancel")],
        ],
    };

    OutgoingView::with_keyboard(text, keyboard)
}

/// Confirmation screen, regenerated from the full draft.
#[must_use]
pub fn confirmation(draft: &DraftOrder) -> OutgoingView {
    let rr = draft
        .risk_reward()
        .map_or_else(|| "-".to_string(), |rr| format!("1:{:.2}", rr));

    let text = format!(
        "*READY TO EXECUTE?*\n\n\
         {} {}\n\
         Entry: {}\n\
         Stop Loss: {}\n\
         Take Profit: {}\n\
         R:R Ratio: {rr}\n\n\
         Confirm to execute or cancel.",
        draft.symbol,
        draft.direction,
        draft.effective_entry(),
        draft.effective_stop(),
        draft.target,
    );

    let keyboard = InlineKeyboard {
        inline_keyboard: vec![
            vec![
                InlineButton::new("CONFIRM TRADE", "exec:confirm"),
                InlineButton::new("CANCEL", "exec:cancel"),
            ],
            vec![
                InlineButton::new("Adjust entry", "menu:entry"),
                InlineButton::new("Adjust stop", "menu:stop"),
            ],
        ],
    };

    OutgoingView::with_keyboard(text, keyboard)
}

/// Rejection view for a numeric reply that failed sanity checks.
#[must_use]
pub fn invalid_number(raw: &str) -> OutgoingView {
    OutgoingView::text(format!("`{raw}` is not a usable price. Send a positive number."))
}

/// Session ended without executing.
#[must_use]
pub fn cancelled(symbol: &str) -> OutgoingView {
    OutgoingView::text(format!("Order construction for {symbol} cancelled."))
}
