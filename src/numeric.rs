//! # numeric — total numeric coercion
//!
//! Every number that comes from outside the pipeline (exchange snapshots,
//! decision journal, position payloads) is read through this module.
//! Nothing in here can fail: a value that is not a finite number becomes
//! `None`, and the `coerce_*` / `lenient_*` helpers turn that into a fallback.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read a JSON value as a finite `f64`.
///
/// Numbers and numeric strings (surrounding whitespace allowed) are accepted.
/// `null`, booleans, objects, arrays, `NaN`/`inf` and garbage yield `None`.
pub fn safe_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// [`safe_f64`] with a fallback.
#[inline]
pub fn coerce_f64(value: &Value, default: f64) -> f64 {
    safe_f64(value).unwrap_or(default)
}

/// Round `x` to `dp` decimal places.
///
/// Rounds the exact binary value (the same digits `{:.dp$}` prints), so
/// `round_dp(2.675, 2)` is `2.67`, not `2.68`. Non-finite input becomes `0.0`
/// and negative zero is folded into `0.0`.
pub fn round_dp(x: f64, dp: u32) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let rounded = format!("{:.*}", dp as usize, x)
        .parse::<f64>()
        .unwrap_or(0.0);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// serde `deserialize_with` helper: any JSON value → `f64`, `0.0` on junk.
///
/// Pair with `#[serde(default)]` so a missing key also lands on `0.0`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value, 0.0))
}

/// serde `deserialize_with` helper for integer fields such as epoch millis.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        other => safe_f64(other).map(|f| f as i64).unwrap_or(0),
    })
}

/// serde `deserialize_with` helper: `null` → `T::default()`.
///
/// `#[serde(default)]` only covers a missing key; collaborators also send
/// `null` for an absent section.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_f64_accepts_numbers_and_numeric_strings() {
        assert_eq!(safe_f64(&json!(1.5)), Some(1.5));
        assert_eq!(safe_f64(&json!(42)), Some(42.0));
        assert_eq!(safe_f64(&json!(" 0.0001 ")), Some(0.0001));
        assert_eq!(safe_f64(&json!("1e-6")), Some(0.000001));
    }

    #[test]
    fn test_safe_f64_rejects_everything_else() {
        assert_eq!(safe_f64(&Value::Null), None);
        assert_eq!(safe_f64(&json!(true)), None);
        assert_eq!(safe_f64(&json!("abc")), None);
        assert_eq!(safe_f64(&json!("NaN")), None);
        assert_eq!(safe_f64(&json!("inf")), None);
        assert_eq!(safe_f64(&json!([1.0])), None);
        assert_eq!(safe_f64(&json!({ "v": 1.0 })), None);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(1.23456, 2), 1.23);
        assert_eq!(round_dp(1.235001, 2), 1.24);
        assert_eq!(round_dp(2.675, 2), 2.67); // 2.675 is 2.67499999... in binary
        assert_eq!(round_dp(12345.6, 0), 12346.0);
        assert_eq!(round_dp(f64::NAN, 2), 0.0);
        assert_eq!(round_dp(f64::INFINITY, 2), 0.0);
        assert!(round_dp(-0.0001, 2).is_sign_positive());
    }

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_f64")]
        price: f64,
        #[serde(default, deserialize_with = "lenient_i64")]
        time: i64,
    }

    #[test]
    fn test_lenient_fields_never_fail() {
        let p: Sample = serde_json::from_value(json!({ "price": "67000.5", "time": "1700000000000" })).unwrap();
        assert_eq!(p.price, 67000.5);
        assert_eq!(p.time, 1_700_000_000_000);

        let p: Sample = serde_json::from_value(json!({ "price": "n/a", "time": null })).unwrap();
        assert_eq!(p.price, 0.0);
        assert_eq!(p.time, 0);

        let p: Sample = serde_json::from_value(json!({})).unwrap();
        assert_eq!(p.price, 0.0);
        assert_eq!(p.time, 0);
    }

    #[derive(Debug, Deserialize)]
    struct Section {
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<u32>,
    }

    #[test]
    fn test_null_section_becomes_default() {
        let s: Section = serde_json::from_value(json!({ "items": null })).unwrap();
        assert!(s.items.is_empty());
        let s: Section = serde_json::from_value(json!({})).unwrap();
        assert!(s.items.is_empty());
        let s: Section = serde_json::from_value(json!({ "items": [1, 2] })).unwrap();
        assert_eq!(s.items, vec![1, 2]);
    }
}
