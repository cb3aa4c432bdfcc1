//! Structural validation of parsed alerts.

use rust_decimal::Decimal;

use crate::models::{Alert, AlertDirection};

use super::AlertRejection;

/// Enforce the price-ordering invariant on a parsed alert.
///
/// Buy: stop < entry < every target. Sell: every target < entry < stop.
/// Close alerts carry no price fields and skip validation entirely.
pub fn validate_alert(alert: &Alert) -> Result<(), AlertRejection> {
    if alert.direction == AlertDirection::Close {
        return Ok(());
    }

    let entry = require_positive(alert.entry)?;
    let stop = require_positive(alert.stop_loss)?;
    let targets = alert.target_prices();
    if targets.is_empty() {
        return Err(AlertRejection::MissingPrice);
    }

    if stop == entry || targets.iter().any(|t| *t == entry) {
        return Err(AlertRejection::DirectionPriceMismatch);
    }

    let ordered = match alert.direction {
        AlertDirection::Buy => stop < entry && targets.iter().all(|t| *t > entry),
        AlertDirection::Sell => stop > entry && targets.iter().all(|t| *t < entry),
        AlertDirection::Close => true,
    };

    if ordered {
        Ok(())
    } else {
        Err(AlertRejection::DirectionPriceMismatch)
    }
}

fn require_positive(price: Option<Decimal>) -> Result<Decimal, AlertRejection> {
    match price {
        Some(p) if p > Decimal::ZERO => Ok(p),
        _ => Err(AlertRejection::MissingPrice),
    }
}
