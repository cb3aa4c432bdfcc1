//! Interactive order builder.
//!
//! A small state machine driven by inline-keyboard button presses and typed
//! numeric replies:
//!
//! ```text
//! Idle -> AwaitingStopInput -> AwaitingEntryInput -> AwaitingConfirmation
//!                                   |                      |
//!                                   +-- executed/cancelled-+--> Idle
//! ```
//!
//! Button actions select the next screen; a numeric reply is accepted only
//! when the operator's session step expects one. Every transition is a pure
//! function of `(session, input)` returning the new session and the view to
//! hand to the notifier. Nothing here performs I/O.

mod session;
pub mod views;

pub use session::{DraftOrder, MenuSession, MenuStep, SessionStore};

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::Direction;
use crate::notifier::OutgoingView;

/// Stop-loss preset adjustments, in pips off the alert's stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPreset {
    /// Keep the alert's stop.
    Default,
    /// Widen by 5 pips.
    Plus5,
    /// Widen by 10 pips.
    Plus10,
    /// Tighten by 5 pips.
    Minus5,
}

impl StopPreset {
    fn apply(self, stop: Decimal) -> Decimal {
        match self {
            Self::Default => stop,
            Self::Plus5 => stop + dec!(0.0005),
            Self::Plus10 => stop + dec!(0.0010),
            Self::Minus5 => stop - dec!(0.0005),
        }
    }
}

/// Entry preset adjustments, relative to the alert's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPreset {
    /// Keep the alert's entry.
    Current,
    /// 1% below.
    Minus1Pct,
    /// 2% below.
    Minus2Pct,
    /// 1% above.
    Plus1Pct,
}

impl EntryPreset {
    fn apply(self, entry: Decimal) -> Decimal {
        match self {
            Self::Current => entry,
            Self::Minus1Pct => entry * dec!(0.99),
            Self::Minus2Pct => entry * dec!(0.98),
            Self::Plus1Pct => entry * dec!(1.01),
        }
    }
}

/// Parsed button action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Start a session from an alert seed; opens the stop-loss screen.
    StartTrade(DraftOrder),
    /// Open the stop-loss screen.
    ShowStopMenu,
    /// Open the entry screen.
    ShowEntryMenu,
    /// Apply a stop preset and move to confirmation.
    ApplyStop(StopPreset),
    /// Apply an entry preset and move to confirmation.
    ApplyEntry(EntryPreset),
    /// Execute the draft.
    Confirm,
    /// Abandon the draft.
    Cancel,
}

/// Parse callback data into a [`MenuAction`].
///
/// Unknown data yields `None`; the pipeline drops it without side effects.
#[must_use]
pub fn parse_action(data: &str) -> Option<MenuAction> {
    match data {
        "menu:stop" => return Some(MenuAction::ShowStopMenu),
        "menu:entry" => return Some(MenuAction::ShowEntryMenu),
        "exec:confirm" => return Some(MenuAction::Confirm),
        "exec:cancel" => return Some(MenuAction::Cancel),
        "stop:default" => return Some(MenuAction::ApplyStop(StopPreset::Default)),
        "stop:plus5" => return Some(MenuAction::ApplyStop(StopPreset::Plus5)),
        "stop:plus10" => return Some(MenuAction::ApplyStop(StopPreset::Plus10)),
        "stop:minus5" => return Some(MenuAction::ApplyStop(StopPreset::Minus5)),
        "entry:current" => return Some(MenuAction::ApplyEntry(EntryPreset::Current)),
        "entry:minus1" => return Some(MenuAction::ApplyEntry(EntryPreset::Minus1Pct)),
        "entry:minus2" => return Some(MenuAction::ApplyEntry(EntryPreset::Minus2Pct)),
        "entry:plus1" => return Some(MenuAction::ApplyEntry(EntryPreset::Plus1Pct)),
        _ => {}
    }

    // trade:<symbol>:<BUY|SELL>:<entry>:<stop>:<target>
    let mut parts = data.split(':');
    if parts.next()? != "trade" {
        return None;
    }
    let symbol = parts.next()?.to_uppercase();
    let direction = match parts.next()? {
        "BUY" => Direction::Buy,
        "SELL" => Direction::Sell,
        _ => return None,
    };
    let entry = Decimal::from_str(parts.next()?).ok()?;
    let stop = Decimal::from_str(parts.next()?).ok()?;
    let target = Decimal::from_str(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(MenuAction::StartTrade(DraftOrder {
        symbol,
        direction,
        entry,
        stop,
        target,
        buy_limit: None,
        stop_limit: None,
    }))
}

/// Outcome of applying an input to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The session continues; the view goes to the notifier.
    Continue {
        /// Updated session to store.
        session: MenuSession,
        /// Screen to show.
        view: OutgoingView,
    },
    /// The draft was confirmed; the session is over and the order executes.
    Execute {
        /// Confirmed draft.
        draft: DraftOrder,
    },
    /// The session ended without executing.
    Cancelled {
        /// Farewell view.
        view: OutgoingView,
    },
    /// The input was not addressed to this subsystem.
    Ignored,
}

/// Apply a button action for `operator_id`.
#[must_use]
pub fn apply_action(
    session: Option<MenuSession>,
    operator_id: i64,
    action: MenuAction,
    now: DateTime<Utc>,
) -> Transition {
    match action {
        MenuAction::StartTrade(draft) => {
            let session = MenuSession::begin(operator_id, draft, now);
            let view = views::stop_menu(&session.draft);
            Transition::Continue { session, view }
        }
        MenuAction::ShowStopMenu => step_to(session, MenuStep::AwaitingStopInput, now),
        MenuAction::ShowEntryMenu => step_to(session, MenuStep::AwaitingEntryInput, now),
        MenuAction::ApplyStop(preset) => {
            let Some(mut session) = session else {
                return Transition::Ignored;
            };
            session.draft.stop_limit = Some(preset.apply(session.draft.stop));
            advance_to_confirmation(session, now)
        }
        MenuAction::ApplyEntry(preset) => {
            let Some(mut session) = session else {
                return Transition::Ignored;
            };
            session.draft.buy_limit = Some(preset.apply(session.draft.entry));
            advance_to_confirmation(session, now)
        }
        MenuAction::Confirm => match session {
            Some(session) if session.step == MenuStep::AwaitingConfirmation => {
                Transition::Execute {
                    draft: session.draft,
                }
            }
            _ => Transition::Ignored,
        },
        MenuAction::Cancel => session.map_or(Transition::Ignored, |session| {
            Transition::Cancelled {
                view: views::cancelled(&session.draft.symbol),
            }
        }),
    }
}

/// Apply a typed numeric reply.
///
/// Only meaningful while the step expects numeric input. A non-positive
/// value is rejected and the session is left unchanged.
#[must_use]
pub fn apply_reply(mut session: MenuSession, value: Decimal, now: DateTime<Utc>) -> Transition {
    if !session.step.expects_numeric() {
        return Transition::Ignored;
    }

    if value <= Decimal::ZERO {
        let view = views::invalid_number(&value.to_string());
        return Transition::Continue { session, view };
    }

    match session.step {
        MenuStep::AwaitingStopInput => session.draft.stop_limit = Some(value),
        MenuStep::AwaitingEntryInput => session.draft.buy_limit = Some(value),
        MenuStep::Idle | MenuStep::AwaitingConfirmation => return Transition::Ignored,
    }

    advance_to_confirmation(session, now)
}

fn step_to(session: Option<MenuSession>, step: MenuStep, now: DateTime<Utc>) -> Transition {
    let Some(mut session) = session else {
        return Transition::Ignored;
    };
    session.step = step;
    session.last_touched = now;
    let view = match step {
        MenuStep::AwaitingStopInput => views::stop_menu(&session.draft),
        MenuStep::AwaitingEntryInput => views::entry_menu(&session.draft),
        MenuStep::AwaitingConfirmation | MenuStep::Idle => views::confirmation(&session.draft),
    };
    Transition::Continue { session, view }
}

fn advance_to_confirmation(mut session: MenuSession, now: DateTime<Utc>) -> Transition {
    session.step = MenuStep::AwaitingConfirmation;
    session.last_touched = now;
    let view = views::confirmation(&session.draft);
    Transition::Continue { session, view }
}
