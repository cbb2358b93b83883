//! # precision — per-instrument decimal places
//!
//! Exchanges publish the minimum price increment (`tickSize`) and quantity
//! increment (`stepSize`) per symbol. The number of decimals in those steps is
//! what every price/quantity in the payload gets rounded to.
//!
//! The result is an explicit [`PrecisionTable`] handed to the engine, never a
//! global, so tests can feed synthetic tables.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric::{null_as_default, round_dp};

/// Upper bound for any derived decimal-place count.
pub const MAX_DECIMALS: u32 = 18;

pub const DEFAULT_PRICE_DECIMALS: u32 = 2;
pub const DEFAULT_QTY_DECIMALS: u32 = 4;

/// Decimal places implied by a tick/step value.
///
/// Accepts `"0.01000000"`, `"1e-6"`, `0.001` or `"1"`. The value is parsed as
/// an exact decimal so `0.1` yields `1`. Missing, unparseable, zero or
/// negative steps return `default`.
pub fn decimals_from_step(step: &Value, default: u32) -> u32 {
    let text = match step {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return default,
    };

    let Ok(d) = BigDecimal::from_str(&text) else {
        return default;
    };
    if d <= BigDecimal::zero() {
        return default;
    }

    // scale = digits after the decimal point (negative for "1E+2")
    let (_, scale) = d.as_bigint_and_exponent();
    scale.clamp(0, MAX_DECIMALS as i64) as u32
}

// ─── Filters ──────────────────────────────────────────────────────────────────

/// Tick/step metadata for one symbol.
///
/// Either the flattened `tick_size` / `step_size` pair or the raw
/// exchange-info `filters` array (`PRICE_FILTER`, `LOT_SIZE`,
/// `MARKET_LOT_SIZE`) may be supplied; the flattened fields win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    #[serde(default, alias = "tickSize")]
    pub tick_size: Value,
    #[serde(default, alias = "stepSize")]
    pub step_size: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<Value>,
}

impl SymbolFilters {
    pub fn tick_size(&self) -> &Value {
        if !self.tick_size.is_null() {
            return &self.tick_size;
        }
        self.filter_field("PRICE_FILTER", "tickSize")
    }

    pub fn step_size(&self) -> &Value {
        if !self.step_size.is_null() {
            return &self.step_size;
        }
        match self.filter_field("LOT_SIZE", "stepSize") {
            Value::Null => self.filter_field("MARKET_LOT_SIZE", "stepSize"),
            v => v,
        }
    }

    fn filter_field(&self, filter_type: &str, key: &str) -> &Value {
        self.filters
            .iter()
            .find(|f| f.get("filterType").and_then(Value::as_str) == Some(filter_type))
            .and_then(|f| f.get(key))
            .unwrap_or(&Value::Null)
    }
}

// ─── Table ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrecisionDefaults {
    pub price_decimals: u32,
    pub qty_decimals: u32,
}

impl Default for PrecisionDefaults {
    fn default() -> Self {
        Self {
            price_decimals: DEFAULT_PRICE_DECIMALS,
            qty_decimals: DEFAULT_QTY_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecisionSpec {
    pub instrument_id: String,
    pub price_decimals: u32,
    pub qty_decimals: u32,
}

impl PrecisionSpec {
    pub fn resolve(instrument_id: &str, filters: &SymbolFilters, defaults: PrecisionDefaults) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            price_decimals: decimals_from_step(filters.tick_size(), defaults.price_decimals),
            qty_decimals: decimals_from_step(filters.step_size(), defaults.qty_decimals),
        }
    }
}

/// Symbol → decimal places, with defaults for symbols never registered.
#[derive(Debug, Clone, Default)]
pub struct PrecisionTable {
    specs: HashMap<String, PrecisionSpec>,
    defaults: PrecisionDefaults,
}

impl PrecisionTable {
    pub fn new(defaults: PrecisionDefaults) -> Self {
        Self { specs: HashMap::new(), defaults }
    }

    /// Resolve every `(symbol, filters)` pair once.
    pub fn from_filters<'a, I>(entries: I, defaults: PrecisionDefaults) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a SymbolFilters)>,
    {
        let mut table = Self::new(defaults);
        for (symbol, filters) in entries {
            table.insert(PrecisionSpec::resolve(symbol, filters, defaults));
        }
        table
    }

    pub fn insert(&mut self, spec: PrecisionSpec) {
        self.specs.insert(spec.instrument_id.clone(), spec);
    }

    pub fn price_decimals(&self, symbol: &str) -> u32 {
        self.specs
            .get(symbol)
            .map_or(self.defaults.price_decimals, |s| s.price_decimals)
    }

    pub fn qty_decimals(&self, symbol: &str) -> u32 {
        self.specs
            .get(symbol)
            .map_or(self.defaults.qty_decimals, |s| s.qty_decimals)
    }

    #[inline]
    pub fn round_price(&self, symbol: &str, x: f64) -> f64 {
        round_dp(x, self.price_decimals(symbol))
    }

    #[inline]
    pub fn round_qty(&self, symbol: &str, x: f64) -> f64 {
        round_dp(x, self.qty_decimals(symbol))
    }
}
