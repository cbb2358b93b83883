//! # models::decision
//!
//! [`DecisionRecord`] — one past verdict of the model, as it appears in the
//! per-instrument `decision_history` window.
//!
//! The journal is free-form JSON written over many releases, so records are
//! read key by key from a `serde_json::Value` instead of through a strict
//! struct: a record with odd fields still makes it into the window.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric::{coerce_f64, safe_f64};

/// Confidence assigned when the journal holds something unreadable.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

// ─── Confidence ───────────────────────────────────────────────────────────────

/// Qualitative confidence labels older journal entries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            Self::High => 0.8,
            Self::Medium => 0.6,
            Self::Low => 0.4,
        }
    }
}

/// Map a raw confidence to `[0, 1]`.
///
/// `HIGH`/`MEDIUM`/`LOW` → 0.8/0.6/0.4, a number (or numeric string) already in
/// `[0, 1]` passes through, everything else is [`NEUTRAL_CONFIDENCE`].
pub fn normalize_confidence(raw: &Value) -> f64 {
    if let Some(label) = raw.as_str().and_then(ConfidenceLabel::parse) {
        return label.weight();
    }
    safe_f64(raw)
        .filter(|v| (0.0..=1.0).contains(v))
        .unwrap_or(NEUTRAL_CONFIDENCE)
}

// ─── DecisionRecord ───────────────────────────────────────────────────────────

/// Normalized history entry. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    /// Kept verbatim from the journal (usually ISO-8601, may be junk).
    pub timestamp: Value,
    pub action: Value,
    pub confidence: f64,
    pub leverage: f64,
    pub open_percent: f64,
    pub reduce_percent: f64,
    pub reason: Value,
    /// Market price when the decision was taken.
    pub price: f64,
    /// Position snapshot recorded after execution, passed through as-is.
    pub position_after: Value,
}

impl DecisionRecord {
    /// Symbol of a raw journal entry; `None` for missing, empty or non-string.
    pub fn instrument_of(raw: &Value) -> Option<&str> {
        raw.get("symbol")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Normalize one raw journal entry.
    pub fn from_raw(raw: &Value) -> Self {
        let field = |key: &str| raw.get(key).cloned().unwrap_or(Value::Null);
        let num = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| raw.get(*k))
                .map_or(0.0, |v| coerce_f64(v, 0.0))
        };

        Self {
            timestamp: field("timestamp"),
            action: field("action"),
            confidence: normalize_confidence(raw.get("confidence").unwrap_or(&Value::Null)),
            leverage: num(&["leverage"]),
            open_percent: num(&["open_percent", "position_percent"]),
            reduce_percent: num(&["reduce_percent"]),
            reason: field("reason"),
            price: num(&["price"]),
            position_after: raw
                .get("position_after")
                .or_else(|| raw.get("positionAfterExecution"))
                .cloned()
                .unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confidence_labels() {
        assert_eq!(normalize_confidence(&json!("HIGH")), 0.8);
        assert_eq!(normalize_confidence(&json!("MEDIUM")), 0.6);
        assert_eq!(normalize_confidence(&json!("LOW")), 0.4);
        assert_eq!(normalize_confidence(&json!(" high ")), 0.8);
    }

    #[test]
    fn test_confidence_numbers() {
        assert_eq!(normalize_confidence(&json!(0.73)), 0.73);
        assert_eq!(normalize_confidence(&json!(0)), 0.0);
        assert_eq!(normalize_confidence(&json!(1)), 1.0);
        assert_eq!(normalize_confidence(&json!("0.65")), 0.65);
    }

    #[test]
    fn test_confidence_fallbacks() {
        assert_eq!(normalize_confidence(&json!(1.5)), 0.5);
        assert_eq!(normalize_confidence(&json!(-0.1)), 0.5);
        assert_eq!(normalize_confidence(&json!("garbage")), 0.5);
        assert_eq!(normalize_confidence(&Value::Null), 0.5);
        assert_eq!(normalize_confidence(&json!(true)), 0.5);
    }

    #[test]
    fn test_record_from_current_journal_shape() {
        let raw = json!({
            "timestamp": "2025-01-01T12:00:00",
            "symbol": "BTCUSDT",
            "action": "BUY_OPEN",
            "confidence": "HIGH",
            "leverage": 5,
            "open_percent": "20",
            "reduce_percent": 0,
            "reason": "RSI rebound",
            "price": 67000.5,
            "positionAfterExecution": { "side": "LONG" }
        });

        let rec = DecisionRecord::from_raw(&raw);
        assert_eq!(DecisionRecord::instrument_of(&raw), Some("BTCUSDT"));
        assert_eq!(rec.confidence, 0.8);
        assert_eq!(rec.leverage, 5.0);
        assert_eq!(rec.open_percent, 20.0);
        assert_eq!(rec.price, 67000.5);
        assert_eq!(rec.position_after, json!({ "side": "LONG" }));
    }

    #[test]
    fn test_record_from_legacy_shape() {
        let raw = json!({ "symbol": "", "position_percent": 15, "leverage": "x" });
        let rec = DecisionRecord::from_raw(&raw);
        assert_eq!(DecisionRecord::instrument_of(&raw), None);
        assert_eq!(rec.open_percent, 15.0);
        assert_eq!(rec.leverage, 0.0);
        assert_eq!(rec.timestamp, Value::Null);
        assert_eq!(rec.position_after, Value::Null);
    }

    #[test]
    fn test_serialized_key_order() {
        let rec = DecisionRecord::from_raw(&json!({ "symbol": "ETHUSDT" }));
        let text = serde_json::to_string(&rec).unwrap();
        assert!(text.starts_with(r#"{"timestamp":null,"action":null,"confidence":0.5,"leverage":0.0"#));
        assert!(text.ends_with(r#""price":0.0,"position_after":null}"#));
    }
}
