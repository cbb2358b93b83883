//! # models::payload
//!
//! Output side of the pipeline: the [`Payload`] document handed to the model
//! once per cycle.
//!
//! Key names and key order are part of the contract with the downstream
//! consumer. serde emits fields in declaration order, so do not reorder the
//! fields below.

use serde::Serialize;

use crate::engine::indicators::{BollPoint, KdjPoint};
use crate::engine::patterns::CandlePattern;
use crate::models::DecisionRecord;

// ─── Root ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub meta: Meta,
    /// `null` when no account summary was supplied.
    pub account: Option<AccountBlock>,
    pub symbols: Vec<InstrumentContext>,
}

impl Payload {
    /// Compact JSON. Infallible for this type (string keys, finite floats).
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    /// Generation time, `%Y-%m-%d %H:%M:%S`. The only clock-dependent field.
    pub now: String,
    pub exchange: String,
}

// ─── Account ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBlock {
    pub equity: f64,
    pub available_balance: f64,
    pub total_unrealized_pnl: f64,
    pub risk: RiskHints,
    pub position_rules: PositionRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskHints {
    pub default_stop_loss_percent: f64,
    pub default_take_profit_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionRules {
    pub min_position_percent: f64,
    pub max_position_percent: f64,
}

// ─── Instrument ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentContext {
    /// `"BTC/USDT"` style label.
    pub market: String,
    pub funding: f64,
    pub open_interest: f64,
    pub current_price: f64,
    pub position: Option<PositionView>,
    pub market_data: Vec<TimeframeBlock>,
    /// Oldest → newest.
    pub decision_history: Vec<DecisionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    pub side: Side,
    #[serde(rename = "positionAmt")]
    pub position_amt: f64,
    pub entry_price: f64,
    pub leverage: f64,
    pub unrealized_pnl: f64,
    pub pnl_percent: f64,
    #[serde(rename = "isolatedMargin")]
    pub isolated_margin: f64,
    #[serde(rename = "updateTime")]
    pub update_time: i64,
}

// ─── Timeframe ────────────────────────────────────────────────────────────────

/// Indicator bundle for one timeframe. All series are oldest → newest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeBlock {
    pub time_frame: String,
    pub ema20: f64,
    pub ema50: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub atr14: f64,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub histogram: Vec<f64>,
    pub kdj: Vec<KdjPoint>,
    pub boll: Vec<BollPoint>,
    pub patterns: Vec<CandlePattern>,
    pub ohlc: Vec<OhlcRow>,
    pub funding: f64,
}

/// One recent bar as shown to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OhlcRow {
    #[serde(rename = "O")]
    pub open: f64,
    #[serde(rename = "H")]
    pub high: f64,
    #[serde(rename = "L")]
    pub low: f64,
    #[serde(rename = "C")]
    pub close: f64,
    #[serde(rename = "V")]
    pub volume: f64,
}
