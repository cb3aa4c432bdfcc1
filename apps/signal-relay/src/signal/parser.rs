//! Free-text alert parsing.
//!
//! Providers post alerts in a handful of loosely standardized shapes:
//!
//! - `BUY EURUSD | Entry: 1.17443 - 1.17914 | Stop: 1.16501 | TP Range: TP1 1.18149 | TP2 1.18620`
//! - `BUY EURUSD 1.0900 SL: 1.0880 TP: 1.0950`
//! - `**SELL** BTCUSD @ 42500 | SL 41800 | TP 43200`
//! - `{"signal": "BUY", "asset": "EURUSD", "entry": 1.09, "sl": 1.088, "tp": 1.095}`
//! - `CLOSE EURUSD`
//!
//! Parsing fails closed: anything ambiguous is rejected rather than
//! guessed.

#![allow(clippy::expect_used)] // Regexes are compile-time constants.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{Alert, AlertDirection, AlertOrigin, AssetCategory, EntryZone, TakeProfitTarget};

use super::AlertRejection;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(BUY|SELL)\s+([A-Z0-9/]+).*?Entry:\s*([\d.]+)\s*-\s*([\d.]+).*?Stop:\s*([\d.]+).*?TP\s*Range:\s*(.+)$",
    )
    .expect("range regex is valid")
});

static TP_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)TP\s*(\d+)\s+([\d.]+)").expect("tp target regex is valid"));

static PLAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(BUY|SELL)\s+([A-Z0-9/]{3,15})\s+@?\s*([\d.]+)\s+SL:?\s*([\d.]+)\s+TP:?\s*([\d.]+)")
        .expect("plain regex is valid")
});

static MARKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*(BUY|SELL)\*\*\s+([A-Z0-9/]+)\s+@\s*([\d.]+).*?SL:?\s*([\d.]+).*?TP:?\s*([\d.]+)")
        .expect("markdown regex is valid")
});

static CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?CLOSE(?:\*\*)?\s+([A-Z0-9/]{3,15})\s*$")
        .expect("close regex is valid")
});

static HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(BUY|SELL)\s+([A-Z0-9/]{3,15})\b").expect("head regex is valid")
});

static CRYPTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(BTC|ETH|XRP|ADA|SOL|BNB|DOGE|LTC|DOT)").expect("crypto regex is valid")
});

static COMMODITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(XAU|XAG|XPT|WTI|BRENT|NGAS|UKOIL|USOIL)|OIL|GAS|GOLD|SILVER")
        .expect("commodity regex is valid")
});

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(US30|US100|US500|NAS100|SPX500|GER40|GER30|DAX|FTSE|UK100|JP225|NDX|DJI)")
        .expect("index regex is valid")
});

static FOREX_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{6}$").expect("forex regex is valid"));

/// JSON alert payload shape.
#[derive(Debug, Deserialize)]
struct JsonSignal {
    signal: String,
    asset: String,
    #[serde(default, alias = "entryPrice")]
    entry: Option<Decimal>,
    #[serde(default, alias = "stopLoss")]
    sl: Option<Decimal>,
    #[serde(default, alias = "takeProfit")]
    tp: Option<Decimal>,
}

/// Map a symbol onto the closed category set.
///
/// Symbols that match no heuristic and are not shaped like a currency pair
/// return `None`; the caller rejects them instead of guessing.
#[must_use]
pub fn categorize_symbol(symbol: &str) -> Option<AssetCategory> {
    let upper = symbol.to_uppercase();

    if CRYPTO_RE.is_match(&upper) {
        return Some(AssetCategory::Crypto);
    }
    if COMMODITY_RE.is_match(&upper) {
        return Some(AssetCategory::Commodities);
    }
    if INDEX_RE.is_match(&upper) {
        return Some(AssetCategory::Indices);
    }
    if FOREX_PAIR_RE.is_match(&upper) {
        return Some(AssetCategory::Forex);
    }

    None
}

/// Parse raw channel text into an [`Alert`].
///
/// Tries the known shapes in order of specificity. `Close` alerts carry no
/// price fields. The returned alert has not yet passed price-ordering
/// validation; see [`super::validate_alert`].
pub fn parse_alert(text: &str, origin: AlertOrigin) -> Result<Alert, AlertRejection> {
    if let Some(caps) = RANGE_RE.captures(text) {
        return parse_range(text, origin, &caps);
    }

    if let Some(caps) = PLAIN_RE.captures(text).or_else(|| MARKDOWN_RE.captures(text)) {
        let direction = parse_direction(&caps[1])?;
        let symbol = caps[2].to_uppercase();
        let entry = parse_price(&caps[3])?;
        let stop = parse_price(&caps[4])?;
        let tp = parse_price(&caps[5])?;
        return build_alert(text, origin, symbol, direction, Some(entry), None, Some(stop), vec![
            TakeProfitTarget {
                label: "TP".to_string(),
                value: tp,
            },
        ]);
    }

    if let Ok(json) = serde_json::from_str::<JsonSignal>(text) {
        let direction = parse_direction(&json.signal)?;
        let symbol = json.asset.to_uppercase();
        let targets = json
            .tp
            .map(|value| TakeProfitTarget {
                label: "TP".to_string(),
                value,
            })
            .into_iter()
            .collect();
        return build_alert(text, origin, symbol, direction, json.entry, None, json.sl, targets);
    }

    if let Some(caps) = CLOSE_RE.captures(text) {
        let symbol = caps[1].to_uppercase();
        return build_alert(text, origin, symbol, AlertDirection::Close, None, None, None, vec![]);
    }

    // Direction and symbol are recognizable but the price block is not.
    if HEAD_RE.is_match(text) {
        return Err(AlertRejection::MissingPrice);
    }

    Err(AlertRejection::Malformed)
}

fn parse_range(
    text: &str,
    origin: AlertOrigin,
    caps: &regex::Captures<'_>,
) -> Result<Alert, AlertRejection> {
    let direction = parse_direction(&caps[1])?;
    let symbol = caps[2].to_uppercase();
    let low = parse_price(&caps[3])?;
    let high = parse_price(&caps[4])?;
    let stop = parse_price(&caps[5])?;

    let targets: Vec<TakeProfitTarget> = TP_TARGET_RE
        .captures_iter(&caps[6])
        .filter_map(|tp| {
            let value = Decimal::from_str(&tp[2]).ok()?;
            Some(TakeProfitTarget {
                label: format!("TP{}", &tp[1]),
                value,
            })
        })
        .collect();

    if targets.is_empty() {
        return Err(AlertRejection::MissingPrice);
    }

    // Conservative end of the zone: lowest price for Buy, highest for Sell.
    let entry = match direction {
        AlertDirection::Buy => low,
        AlertDirection::Sell | AlertDirection::Close => high,
    };

    build_alert(
        text,
        origin,
        symbol,
        direction,
        Some(entry),
        Some(EntryZone { low, high }),
        Some(stop),
        targets,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_alert(
    text: &str,
    origin: AlertOrigin,
    symbol: String,
    direction: AlertDirection,
    entry: Option<Decimal>,
    entry_zone: Option<EntryZone>,
    stop_loss: Option<Decimal>,
    targets: Vec<TakeProfitTarget>,
) -> Result<Alert, AlertRejection> {
    let category = categorize_symbol(&symbol).ok_or(AlertRejection::UnsupportedCategory)?;
    let take_profit = targets.first().map(|t| t.value);

    Ok(Alert {
        symbol,
        direction,
        category,
        entry,
        entry_zone,
        stop_loss,
        take_profit,
        targets,
        origin,
        raw_text: text.to_string(),
        parsed_at: Utc::now(),
    })
}

fn parse_direction(raw: &str) -> Result<AlertDirection, AlertRejection> {
    match raw.to_uppercase().as_str() {
        "BUY" => Ok(AlertDirection::Buy),
        "SELL" => Ok(AlertDirection::Sell),
        "CLOSE" => Ok(AlertDirection::Close),
        _ => Err(AlertRejection::Malformed),
    }
}

fn parse_price(raw: &str) -> Result<Decimal, AlertRejection> {
    Decimal::from_str(raw).map_err(|_| AlertRejection::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_alert() {
        let alert =
            parse_alert("BUY EURUSD 1.0900 SL: 1.0880 TP: 1.0950", AlertOrigin::Provider).unwrap();

        assert_eq!(alert.symbol, "EURUSD");
        assert_eq!(alert.direction, AlertDirection::Buy);
        assert_eq!(alert.category, AssetCategory::Forex);
        assert_eq!(alert.entry, Some(dec!(1.0900)));
        assert_eq!(alert.stop_loss, Some(dec!(1.0880)));
        assert_eq!(alert.take_profit, Some(dec!(1.0950)));
    }

    #[test]
    fn parses_plain_alert_without_colons() {
        let alert = parse_alert("SELL GBPUSD 1.2700 SL 1.2750 TP 1.2600", AlertOrigin::Provider)
            .unwrap();

        assert_eq!(alert.direction, AlertDirection::Sell);
        assert_eq!(alert.entry, Some(dec!(1.2700)));
    }

    #[test]
    fn parses_entry_zone_with_targets() {
        let text = "BUY EURUSD | Entry: 1.17443 - 1.17914 | Stop: 1.16501 | TP Range: TP1 1.18149 | TP2 1.18620";
        let alert = parse_alert(text, AlertOrigin::Provider).unwrap();

        assert_eq!(alert.entry, Some(dec!(1.17443)));
        assert_eq!(
            alert.entry_zone,
            Some(EntryZone {
                low: dec!(1.17443),
                high: dec!(1.17914),
            })
        );
        assert_eq!(alert.targets.len(), 2);
        assert_eq!(alert.targets[0].label, "TP1");
        assert_eq!(alert.take_profit, Some(dec!(1.18149)));
    }

    #[test]
    fn sell_zone_uses_high_end() {
        let text = "SELL EURUSD | Entry: 1.1700 - 1.1750 | Stop: 1.1800 | TP Range: TP1 1.1600";
        let alert = parse_alert(text, AlertOrigin::Provider).unwrap();

        assert_eq!(alert.entry, Some(dec!(1.1750)));
    }

    #[test]
    fn parses_markdown_alert() {
        let alert =
            parse_alert("**SELL** BTCUSD @ 42500 | SL 43200 | TP 41800", AlertOrigin::Provider)
                .unwrap();

        assert_eq!(alert.symbol, "BTCUSD");
        assert_eq!(alert.category, AssetCategory::Crypto);
        assert_eq!(alert.entry, Some(dec!(42500)));
    }

    #[test]
    fn parses_json_alert() {
        let text = r#"{"signal": "BUY", "asset": "EURUSD", "entry": 1.09, "sl": 1.088, "tp": 1.095}"#;
        let alert = parse_alert(text, AlertOrigin::Api).unwrap();

        assert_eq!(alert.symbol, "EURUSD");
        assert_eq!(alert.entry, Some(dec!(1.09)));
        assert_eq!(alert.stop_loss, Some(dec!(1.088)));
    }

    #[test]
    fn parses_close_alert_without_prices() {
        let alert = parse_alert("CLOSE XAUUSD", AlertOrigin::Provider).unwrap();

        assert_eq!(alert.direction, AlertDirection::Close);
        assert_eq!(alert.category, AssetCategory::Commodities);
        assert!(alert.entry.is_none());
        assert!(alert.stop_loss.is_none());
        assert!(alert.targets.is_empty());
    }

    #[test]
    fn rejects_chatter_as_malformed() {
        let rejection = parse_alert("good morning traders!", AlertOrigin::Provider).unwrap_err();
        assert_eq!(rejection, AlertRejection::Malformed);
    }

    #[test]
    fn rejects_direction_without_prices_as_missing_price() {
        let rejection = parse_alert("BUY EURUSD", AlertOrigin::Provider).unwrap_err();
        assert_eq!(rejection, AlertRejection::MissingPrice);
    }

    #[test]
    fn rejects_unknown_symbol_category() {
        let rejection =
            parse_alert("BUY ZZZ 1.0 SL 0.9 TP 1.1", AlertOrigin::Provider).unwrap_err();
        assert_eq!(rejection, AlertRejection::UnsupportedCategory);
    }

    #[test]
    fn categorizes_known_prefixes() {
        assert_eq!(categorize_symbol("BTCUSD"), Some(AssetCategory::Crypto));
        assert_eq!(categorize_symbol("XAGUSD"), Some(AssetCategory::Commodities));
        assert_eq!(categorize_symbol("US30"), Some(AssetCategory::Indices));
        assert_eq!(categorize_symbol("EURUSD"), Some(AssetCategory::Forex));
        assert_eq!(categorize_symbol("WIDGET"), Some(AssetCategory::Forex));
        assert_eq!(categorize_symbol("ZZZ"), None);
    }
}
