//! Environment-based configuration.
//!
//! Every knob comes from environment variables (with `.env` support in the
//! binary), parsed once at startup into a typed [`Config`] and validated
//! before the server starts.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::risk::RiskLimits;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// A validation rule failed.
    #[error("config validation failed: {0}")]
    Validation(String),
}

/// Typed view over the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global kill-switch; nothing executes while false.
    pub allow_trading: bool,
    /// Armed flag; alerts only notify while disarmed.
    pub armed: bool,
    /// Minimum confidence an alert needs to execute.
    pub min_confidence: f64,
    /// Balance assumption when the bridge cannot be queried.
    pub account_balance: Decimal,
    /// Risk limits for order construction.
    pub risk: RiskLimits,
    /// Cap on simultaneously active trades.
    pub max_open_trades: usize,
    /// Shared secret the webhook checks when configured.
    pub webhook_secret: Option<String>,
    /// Chat id of the provider group alerts are accepted from.
    pub provider_group_id: Option<i64>,
    /// Chat id of the execution group notifications go to.
    pub exec_group_id: i64,
    /// Bridge base URL.
    pub bridge_url: String,
    /// Bridge API key.
    pub bridge_api_key: String,
    /// Bridge account number.
    pub bridge_account: String,
    /// Bridge account password.
    pub bridge_password: String,
    /// Bridge terminal server.
    pub bridge_server: String,
    /// Chat API base URL.
    pub chat_api_url: String,
    /// Chat bot token.
    pub chat_bot_token: String,
    /// HTTP port the webhook server binds.
    pub http_port: u16,
    /// Idempotency cache size bound.
    pub dedup_max_entries: usize,
    /// Seconds between idempotency sweeps.
    pub dedup_sweep_secs: u64,
    /// Menu session inactivity TTL in seconds.
    pub session_ttl_secs: i64,
    /// Open-trade cache retention in seconds.
    pub open_trade_retention_secs: i64,
    /// CSV export path.
    pub journal_csv_path: String,
    /// JSONL export path.
    pub journal_jsonl_path: String,
    /// Whether the journal writes its export files.
    pub journal_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_trading: false,
            armed: false,
            min_confidence: 0.65,
            account_balance: dec!(10000),
            risk: RiskLimits::default(),
            max_open_trades: 5,
            webhook_secret: None,
            provider_group_id: None,
            exec_group_id: 0,
            bridge_url: "http://localhost:8187".to_string(),
            bridge_api_key: String::new(),
            bridge_account: String::new(),
            bridge_password: String::new(),
            bridge_server: "Demo".to_string(),
            chat_api_url: "https://api.telegram.org".to_string(),
            chat_bot_token: String::new(),
            http_port: 8080,
            dedup_max_entries: 10_000,
            dedup_sweep_secs: 600,
            session_ttl_secs: 900,
            open_trade_retention_secs: 3600,
            journal_csv_path: "trade_journal.csv".to_string(),
            journal_jsonl_path: "trade_journal.jsonl".to_string(),
            journal_enabled: true,
        }
    }
}

impl Config {
    /// Parse configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            allow_trading: env_bool("ALLOW_TRADING", defaults.allow_trading),
            armed: env_bool("ARMED", defaults.armed),
            min_confidence: env_parse("MIN_ALERT_CONFIDENCE", defaults.min_confidence)?,
            account_balance: env_parse("ACCOUNT_BALANCE", defaults.account_balance)?,
            risk: RiskLimits {
                risk_per_trade: env_parse("RISK_PER_TRADE", defaults.risk.risk_per_trade)?,
                min_lot: env_parse("DEFAULT_LOT", defaults.risk.min_lot)?,
                max_lot: env_parse("MAX_LOT", defaults.risk.max_lot)?,
                lot_step: env_parse("LOT_STEP", defaults.risk.lot_step)?,
                min_risk_reward: env_parse("MIN_RISK_REWARD", defaults.risk.min_risk_reward)?,
            },
            max_open_trades: env_parse("MAX_TRADES_OPEN", defaults.max_open_trades)?,
            webhook_secret: env_opt("WEBHOOK_SECRET"),
            provider_group_id: match env_opt("PROVIDER_GROUP_ID") {
                Some(raw) => Some(parse_value("PROVIDER_GROUP_ID", &raw)?),
                None => None,
            },
            exec_group_id: env_parse("EXEC_GROUP_ID", defaults.exec_group_id)?,
            bridge_url: env_or("BRIDGE_API_URL", &defaults.bridge_url),
            bridge_api_key: env_or("BRIDGE_API_KEY", &defaults.bridge_api_key),
            bridge_account: env_or("BRIDGE_ACCOUNT", &defaults.bridge_account),
            bridge_password: env_or("BRIDGE_PASSWORD", &defaults.bridge_password),
            bridge_server: env_or("BRIDGE_SERVER", &defaults.bridge_server),
            chat_api_url: env_or("CHAT_API_URL", &defaults.chat_api_url),
            chat_bot_token: env_or("CHAT_BOT_TOKEN", &defaults.chat_bot_token),
            http_port: env_parse("HTTP_PORT", defaults.http_port)?,
            dedup_max_entries: env_parse("DEDUP_MAX_ENTRIES", defaults.dedup_max_entries)?,
            dedup_sweep_secs: env_parse("DEDUP_SWEEP_SECS", defaults.dedup_sweep_secs)?,
            session_ttl_secs: env_parse("MENU_SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            open_trade_retention_secs: env_parse(
                "OPEN_TRADE_RETENTION_SECS",
                defaults.open_trade_retention_secs,
            )?,
            journal_csv_path: env_or("TRADE_JOURNAL_FILE", &defaults.journal_csv_path),
            journal_jsonl_path: env_or("TRADE_JOURNAL_JSON", &defaults.journal_jsonl_path),
            journal_enabled: env_bool("JOURNAL_ENABLED", defaults.journal_enabled),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Validation(
                "MIN_ALERT_CONFIDENCE must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.risk.risk_per_trade <= Decimal::ZERO || self.risk.risk_per_trade > Decimal::ONE {
            return Err(ConfigError::Validation(
                "RISK_PER_TRADE must be in (0, 1]".to_string(),
            ));
        }
        if self.risk.min_lot <= Decimal::ZERO || self.risk.max_lot < self.risk.min_lot {
            return Err(ConfigError::Validation(
                "lot range must satisfy 0 < DEFAULT_LOT <= MAX_LOT".to_string(),
            ));
        }
        if self.risk.lot_step <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "LOT_STEP must be positive".to_string(),
            ));
        }
        if self.max_open_trades == 0 {
            return Err(ConfigError::Validation(
                "MAX_TRADES_OPEN must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_or(name: &'static str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_bool(name: &'static str, default: bool) -> bool {
    env_opt(name).map_or(default, |v| v == "true" || v == "1")
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_opt(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let config = Config {
            min_confidence: 1.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_inverted_lot_range() {
        let mut config = Config::default();
        config.risk.min_lot = dec!(2.0);
        config.risk.max_lot = dec!(0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_open_trades() {
        let config = Config {
            max_open_trades: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
