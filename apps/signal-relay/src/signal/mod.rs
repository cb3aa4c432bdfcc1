//! Alert parsing, validation and confidence scoring.

mod parser;
mod scorer;
mod validator;

pub use parser::{categorize_symbol, parse_alert};
pub use scorer::{AlertScore, Grade, ScoreChecks, score_alert};
pub use validator::validate_alert;

use thiserror::Error;

/// Why an alert was rejected before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlertRejection {
    /// The text matched none of the known alert shapes.
    #[error("alert text is malformed")]
    Malformed,
    /// Direction and symbol were recognized but price levels are missing.
    #[error("alert is missing required price levels")]
    MissingPrice,
    /// Price levels contradict the direction (Buy: stop < entry < targets).
    #[error("price levels do not match the direction")]
    DirectionPriceMismatch,
    /// The symbol maps to no supported instrument category.
    #[error("symbol is not in a supported category")]
    UnsupportedCategory,
}
