//! # config — reads Config from environment variables
//!
//! Every variable has a default, so an empty environment runs the mock
//! market once every five minutes. Values that are set but malformed are
//! rejected instead of silently replaced.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::engine::assembler::{DEFAULT_QUOTE_ASSET, DEFAULT_TIMEFRAMES, DEFAULT_VENUE};
use crate::engine::history::DEFAULT_HISTORY_WINDOW;
use crate::engine::{AssemblerConfig, RiskRules};
use crate::error::ContextError;
use crate::journal::DEFAULT_MAX_HISTORY;
use crate::precision::{PrecisionDefaults, MAX_DECIMALS};

/// Everything the context cycle needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot document; `None` → mock market
    pub snapshot_path:  Option<PathBuf>,
    pub journal_path:   PathBuf,
    /// Journal records kept before grouping
    pub max_history:    usize,
    pub history_window: usize,
    /// Priority order, matched exactly against snapshot keys
    pub timeframes:     Vec<String>,
    pub venue:          String,
    pub quote_asset:    String,
    pub precision:      PrecisionDefaults,
    pub risk:           RiskRules,
    /// `None` → run a single cycle and exit
    pub cycle_interval: Option<Duration>,
    /// Where the rendered output goes; `None` → log only
    pub output_path:    Option<PathBuf>,
    /// Full prompt text when true, bare payload JSON otherwise
    pub emit_prompt:    bool,
}

/// `key` parsed as `T`, `default` when unset or blank.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}

fn string_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn path_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<PathBuf> {
    lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from)
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be true/false, got '{other}'"),
    }
}

/// Comma-separated list; blanks dropped, case kept.
fn parse_timeframes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let interval_secs: u64 = parse_var(&lookup, "CYCLE_INTERVAL_SECS", 300)?; // default: 5 minutes

        let timeframes = match lookup("TIMEFRAMES") {
            Some(raw) if !raw.trim().is_empty() => parse_timeframes(&raw),
            _ => DEFAULT_TIMEFRAMES.iter().map(|s| s.to_string()).collect(),
        };

        let emit_prompt = match lookup("EMIT_PROMPT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_bool("EMIT_PROMPT", &raw)?,
            None => true,
        };

        let defaults = RiskRules::default();
        let config = Self {
            snapshot_path:  path_var(&lookup, "MARKET_SNAPSHOT_PATH"),
            journal_path:   path_var(&lookup, "DECISION_JOURNAL_PATH")
                .unwrap_or_else(|| PathBuf::from("./state/decision_history.jsonl")),
            max_history:    parse_var(&lookup, "MAX_HISTORY", DEFAULT_MAX_HISTORY)?,
            history_window: parse_var(&lookup, "HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?,
            timeframes,
            venue:          string_var(&lookup, "VENUE_LABEL", DEFAULT_VENUE),
            quote_asset:    string_var(&lookup, "QUOTE_ASSET", DEFAULT_QUOTE_ASSET),
            precision: PrecisionDefaults {
                price_decimals: parse_var(&lookup, "DEFAULT_PRICE_DP", PrecisionDefaults::default().price_decimals)?,
                qty_decimals:   parse_var(&lookup, "DEFAULT_QTY_DP", PrecisionDefaults::default().qty_decimals)?,
            },
            risk: RiskRules {
                stop_loss_default_percent:   parse_var(&lookup, "STOP_LOSS_DEFAULT_PERCENT", defaults.stop_loss_default_percent)?,
                take_profit_default_percent: parse_var(&lookup, "TAKE_PROFIT_DEFAULT_PERCENT", defaults.take_profit_default_percent)?,
                min_position_percent:        parse_var(&lookup, "MIN_POSITION_PERCENT", defaults.min_position_percent)?,
                max_position_percent:        parse_var(&lookup, "MAX_POSITION_PERCENT", defaults.max_position_percent)?,
            },
            cycle_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            output_path:    path_var(&lookup, "PAYLOAD_OUTPUT_PATH"),
            emit_prompt,
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Cross-field checks that a single parse cannot catch.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.timeframes.is_empty() {
            return Err(ContextError::InvalidConfig("TIMEFRAMES is empty".into()));
        }
        if self.precision.price_decimals > MAX_DECIMALS || self.precision.qty_decimals > MAX_DECIMALS {
            return Err(ContextError::InvalidConfig(format!(
                "default decimals must be <= {MAX_DECIMALS}"
            )));
        }
        let RiskRules { min_position_percent: min, max_position_percent: max, .. } = self.risk;
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(ContextError::InvalidConfig(format!(
                "position percent range {min}..{max} is invalid"
            )));
        }
        Ok(())
    }

    /// The pipeline's view of this config.
    pub fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            timeframes:     self.timeframes.clone(),
            history_window: self.history_window,
            venue:          self.venue.clone(),
            quote_asset:    self.quote_asset.clone(),
            risk:           self.risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = make_config(&[]).unwrap();
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.journal_path, PathBuf::from("./state/decision_history.jsonl"));
        assert_eq!(config.max_history, 300);
        assert_eq!(config.history_window, 10);
        assert_eq!(config.timeframes, vec!["3m", "5m", "15m", "1h", "4h", "1d"]);
        assert_eq!(config.cycle_interval, Some(Duration::from_secs(300)));
        assert!(config.emit_prompt);
        assert_eq!(config.assembler(), AssemblerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = make_config(&[
            ("MARKET_SNAPSHOT_PATH", "/tmp/snap.json"),
            ("TIMEFRAMES", " 1h, 4h ,,1d "),
            ("HISTORY_WINDOW", "5"),
            ("CYCLE_INTERVAL_SECS", "0"),
            ("DEFAULT_PRICE_DP", "3"),
            ("MAX_POSITION_PERCENT", "25.5"),
            ("EMIT_PROMPT", "false"),
            ("QUOTE_ASSET", "USDC"),
        ])
        .unwrap();

        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/snap.json")));
        assert_eq!(config.timeframes, vec!["1h", "4h", "1d"]);
        assert_eq!(config.history_window, 5);
        assert_eq!(config.cycle_interval, None);
        assert_eq!(config.precision.price_decimals, 3);
        assert_eq!(config.risk.max_position_percent, 25.5);
        assert!(!config.emit_prompt);
        assert_eq!(config.assembler().quote_asset, "USDC");
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(make_config(&[("HISTORY_WINDOW", "ten")]).is_err());
        assert!(make_config(&[("EMIT_PROMPT", "maybe")]).is_err());
        assert!(make_config(&[("CYCLE_INTERVAL_SECS", "-1")]).is_err());
    }

    #[test]
    fn test_cross_field_validation() {
        assert!(make_config(&[("TIMEFRAMES", ",,")]).is_err());
        assert!(make_config(&[("DEFAULT_QTY_DP", "19")]).is_err());
        assert!(make_config(&[("MIN_POSITION_PERCENT", "40")]).is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = make_config(&[("MAX_HISTORY", "  "), ("VENUE_LABEL", "")]).unwrap();
        assert_eq!(config.max_history, 300);
        assert_eq!(config.venue, "Binance Perp (USDT-M)");
    }
}
