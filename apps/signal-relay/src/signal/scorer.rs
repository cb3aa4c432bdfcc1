//! Multi-criteria confidence scoring for validated alerts.
//!
//! Seven fixed checks, each worth a fixed number of points out of 90.
//! Pure function of the alert's own fields: no network, no stateful
//! lookups. The pipeline gates execution on the resulting confidence.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::{Alert, AlertDirection, AlertOrigin, AssetCategory};

/// Maximum achievable score across all checks.
const MAX_SCORE: u32 = 90;

/// Discrete quality grade derived from fixed confidence bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    /// confidence >= 0.95
    S,
    /// confidence >= 0.85
    A,
    /// confidence >= 0.75
    B,
    /// confidence >= 0.65
    C,
    /// confidence >= 0.50
    D,
    /// everything below
    F,
}

impl Grade {
    /// Bucket a confidence value into a grade.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.95 {
            Self::S
        } else if confidence >= 0.85 {
            Self::A
        } else if confidence >= 0.75 {
            Self::B
        } else if confidence >= 0.65 {
            Self::C
        } else if confidence >= 0.5 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        write!(f, "{s}")
    }
}

/// Per-check point breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChecks {
    /// Risk-reward band, 15 points max.
    pub risk_reward: u32,
    /// Direction/price consistency, 15 points max.
    pub price_logic: u32,
    /// Stop distance from entry, 12 points max.
    pub stop_distance: u32,
    /// Target distance from entry, 12 points max.
    pub target_distance: u32,
    /// Origin credibility, 15 points max.
    pub origin_credibility: u32,
    /// Category risk, 12 points max.
    pub category_risk: u32,
    /// Volatility check, 9 points max. Scored at the default until an ATR
    /// feed is wired in.
    pub volatility: u32,
}

/// Result of scoring a validated alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertScore {
    /// Total points.
    pub score: u32,
    /// Maximum achievable points.
    pub max_score: u32,
    /// `score / max_score`, clamped to [0, 1].
    pub confidence: f64,
    /// Grade bucket for the confidence.
    pub grade: Grade,
    /// Per-check breakdown.
    pub checks: ScoreChecks,
}

/// Score a validated alert.
#[must_use]
pub fn score_alert(alert: &Alert) -> AlertScore {
    let checks = ScoreChecks {
        risk_reward: risk_reward_points(alert),
        price_logic: price_logic_points(alert),
        stop_distance: stop_distance_points(alert),
        target_distance: target_distance_points(alert),
        origin_credibility: origin_points(alert.origin),
        category_risk: category_points(alert.category),
        volatility: 9,
    };

    let score = checks.risk_reward
        + checks.price_logic
        + checks.stop_distance
        + checks.target_distance
        + checks.origin_credibility
        + checks.category_risk
        + checks.volatility;

    let confidence = (f64::from(score) / f64::from(MAX_SCORE)).clamp(0.0, 1.0);

    AlertScore {
        score,
        max_score: MAX_SCORE,
        confidence,
        grade: Grade::from_confidence(confidence),
        checks,
    }
}

fn risk_reward_points(alert: &Alert) -> u32 {
    let Some(rr) = risk_reward_ratio(alert) else {
        return 0;
    };

    if rr >= 2.0 {
        15
    } else if rr >= 1.5 {
        13
    } else if rr >= 1.0 {
        11
    } else if rr >= 0.5 {
        7
    } else {
        3
    }
}

fn price_logic_points(alert: &Alert) -> u32 {
    let (Some(entry), Some(stop), Some(tp)) = (alert.entry, alert.stop_loss, alert.take_profit)
    else {
        // Close alerts carry no prices; partial credit.
        return 10;
    };

    let correct = match alert.direction {
        AlertDirection::Buy => stop < entry && tp > entry,
        AlertDirection::Sell => tp < entry && stop > entry,
        AlertDirection::Close => return 10,
    };

    if correct { 15 } else { 0 }
}

fn stop_distance_points(alert: &Alert) -> u32 {
    let Some(distance) = relative_distance(alert.entry, alert.stop_loss) else {
        return 0;
    };

    if (0.001..=0.05).contains(&distance) {
        12
    } else if distance < 0.001 {
        6
    } else {
        8
    }
}

fn target_distance_points(alert: &Alert) -> u32 {
    let Some(distance) = relative_distance(alert.entry, alert.take_profit) else {
        return 0;
    };

    if (0.002..=0.2).contains(&distance) {
        12
    } else if distance < 0.002 {
        5
    } else {
        8
    }
}

const fn origin_points(origin: AlertOrigin) -> u32 {
    match origin {
        AlertOrigin::Provider => 15,
        AlertOrigin::Api => 12,
        AlertOrigin::Menu => 8,
    }
}

const fn category_points(category: AssetCategory) -> u32 {
    match category {
        AssetCategory::Forex => 12,
        AssetCategory::Commodities => 11,
        AssetCategory::Indices => 10,
        AssetCategory::Crypto => 8,
    }
}

fn risk_reward_ratio(alert: &Alert) -> Option<f64> {
    let (entry, stop, tp) = (alert.entry?, alert.stop_loss?, alert.take_profit?);
    let risk = (entry - stop).abs();
    if risk.is_zero() {
        return None;
    }
    ((tp - entry).abs() / risk).to_f64()
}

fn relative_distance(entry: Option<Decimal>, level: Option<Decimal>) -> Option<f64> {
    let (entry, level) = (entry?, level?);
    if entry.is_zero() {
        return None;
    }
    ((entry - level).abs() / entry).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TakeProfitTarget;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn alert(
        direction: AlertDirection,
        origin: AlertOrigin,
        category: AssetCategory,
        entry: Decimal,
        stop: Decimal,
        tp: Decimal,
    ) -> Alert {
        Alert {
            symbol: "EURUSD".to_string(),
            direction,
            category,
            entry: Some(entry),
            entry_zone: None,
            stop_loss: Some(stop),
            take_profit: Some(tp),
            targets: vec![TakeProfitTarget {
                label: "TP".to_string(),
                value: tp,
            }],
            origin,
            raw_text: String::new(),
            parsed_at: Utc::now(),
        }
    }

    #[test]
    fn clean_provider_forex_alert_scores_top_marks() {
        let a = alert(
            AlertDirection::Buy,
            AlertOrigin::Provider,
            AssetCategory::Forex,
            dec!(1.0900),
            dec!(1.0880),
            dec!(1.0950),
        );

        let score = score_alert(&a);
        assert_eq!(score.score, 90);
        assert!((score.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(score.grade, Grade::S);
    }

    #[test]
    fn weak_crypto_alert_scores_low() {
        // rr ~0.55, stop well inside 0.1% of entry, tp inside 0.2%.
        let a = alert(
            AlertDirection::Sell,
            AlertOrigin::Menu,
            AssetCategory::Crypto,
            dec!(42500),
            dec!(42520),
            dec!(42489),
        );

        let score = score_alert(&a);
        assert!(score.confidence < 0.65, "confidence {}", score.confidence);
    }

    #[test]
    fn wrong_price_logic_zeroes_the_check() {
        let a = alert(
            AlertDirection::Buy,
            AlertOrigin::Provider,
            AssetCategory::Forex,
            dec!(1.0900),
            dec!(1.0950),
            dec!(1.0880),
        );

        let score = score_alert(&a);
        assert_eq!(score.checks.price_logic, 0);
    }

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_confidence(0.97), Grade::S);
        assert_eq!(Grade::from_confidence(0.88), Grade::A);
        assert_eq!(Grade::from_confidence(0.80), Grade::B);
        assert_eq!(Grade::from_confidence(0.70), Grade::C);
        assert_eq!(Grade::from_confidence(0.55), Grade::D);
        assert_eq!(Grade::from_confidence(0.20), Grade::F);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let a = alert(
            AlertDirection::Buy,
            AlertOrigin::Provider,
            AssetCategory::Forex,
            dec!(1.0900),
            dec!(1.0880),
            dec!(1.0950),
        );
        let score = score_alert(&a);
        assert!((0.0..=1.0).contains(&score.confidence));
    }
}
