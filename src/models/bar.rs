//! # models::bar
//!
//! Defines [`Bar`], one OHLCV interval as delivered by the market-data
//! collaborator. A bar sequence is always ordered oldest → newest and never
//! mutated once built.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric::{coerce_f64, lenient_f64, lenient_i64, safe_f64};

/// A single OHLCV bar.
///
/// Deserializes from either an object (`{"open": .., "high": .., ...}`, short
/// `o/h/l/c/v/t` keys accepted) or a raw exchange kline row
/// `[open_time, open, high, low, close, volume, ...]`. Numbers may arrive as
/// strings; anything unreadable becomes `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawBar")]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Bar open time, epoch milliseconds.
    pub timestamp: i64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { open, high, low, close, volume, timestamp }
    }

    /// Absolute size of the real body.
    #[inline]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    #[inline]
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    #[inline]
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// High − low, floored at `epsilon` so ratios never divide by zero.
    #[inline]
    pub fn range(&self, epsilon: f64) -> f64 {
        (self.high - self.low).max(epsilon)
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        (self.high - self.low)
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }
}

// ─── Wire shapes ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBar {
    Kline(Vec<Value>),
    Object(BarObject),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
struct BarObject {
    #[serde(default, alias = "o", deserialize_with = "lenient_f64")]
    open: f64,
    #[serde(default, alias = "h", deserialize_with = "lenient_f64")]
    high: f64,
    #[serde(default, alias = "l", deserialize_with = "lenient_f64")]
    low: f64,
    #[serde(default, alias = "c", deserialize_with = "lenient_f64")]
    close: f64,
    #[serde(default, alias = "v", deserialize_with = "lenient_f64")]
    volume: f64,
    #[serde(default, alias = "t", alias = "open_time", deserialize_with = "lenient_i64")]
    timestamp: i64,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        match raw {
            RawBar::Object(o) => Bar::new(o.timestamp, o.open, o.high, o.low, o.close, o.volume),
            RawBar::Kline(row) => {
                let num = |i: usize| row.get(i).map_or(0.0, |v| coerce_f64(v, 0.0));
                let ts = row.first().and_then(safe_f64).map_or(0, |t| t as i64);
                Bar::new(ts, num(1), num(2), num(3), num(4), num(5))
            }
            RawBar::Other(_) => Bar::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bar_from_object() {
        let bar: Bar = serde_json::from_value(json!({
            "open": "100.0", "high": 101.0, "low": 99.0, "close": 100.5,
            "volume": 12.0, "timestamp": 1_700_000_000_000_i64
        }))
        .unwrap();
        assert_eq!(bar, Bar::new(1_700_000_000_000, 100.0, 101.0, 99.0, 100.5, 12.0));
    }

    #[test]
    fn test_bar_from_short_keys() {
        let bar: Bar = serde_json::from_value(json!({ "t": 1, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5, "v": 3.0 })).unwrap();
        assert_eq!(bar, Bar::new(1, 1.0, 2.0, 0.5, 1.5, 3.0));
    }

    #[test]
    fn test_bar_from_exchange_kline_row() {
        let bar: Bar = serde_json::from_value(json!([
            1_700_000_000_000_i64, "67000.1", "67100.0", "66900.0", "67050.5", "12.345",
            1_700_000_179_999_i64, "827000.0", 1200, "6.0", "402000.0", "0"
        ]))
        .unwrap();
        assert_eq!(bar.timestamp, 1_700_000_000_000);
        assert_eq!(bar.open, 67000.1);
        assert_eq!(bar.close, 67050.5);
        assert_eq!(bar.volume, 12.345);
    }

    #[test]
    fn test_malformed_bar_degrades_to_zero() {
        let bar: Bar = serde_json::from_value(json!("not a bar")).unwrap();
        assert_eq!(bar, Bar::default());

        let bars: Vec<Bar> = serde_json::from_value(json!([null, true, [0, "1", "2", "0.5", "1.5"]])).unwrap();
        assert_eq!(bars[0], Bar::default());
        assert_eq!(bars[1], Bar::default());
        assert_eq!(bars[2].close, 1.5);

        let bar: Bar = serde_json::from_value(json!({ "open": "x", "close": null })).unwrap();
        assert_eq!(bar.open, 0.0);
        assert_eq!(bar.close, 0.0);
    }

    #[test]
    fn test_anatomy() {
        let bar = Bar::new(0, 100.0, 104.0, 95.0, 102.0, 0.0);
        assert_eq!(bar.body(), 2.0);
        assert_eq!(bar.upper_shadow(), 2.0);
        assert_eq!(bar.lower_shadow(), 5.0);
        assert_eq!(bar.range(1e-12), 9.0);
        assert!(bar.is_bullish());
        assert_eq!(Bar::new(0, 1.0, 1.0, 1.0, 1.0, 0.0).range(1e-12), 1e-12);
    }

    #[test]
    fn test_true_range_uses_gap_from_previous_close() {
        let bar = Bar::new(0, 110.0, 112.0, 109.0, 111.0, 0.0);
        assert_eq!(bar.true_range(100.0), 12.0);
        assert_eq!(bar.true_range(110.0), 3.0);
    }
}
