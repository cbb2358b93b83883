//! # engine::history
//!
//! Groups the flat decision journal into per-instrument windows, oldest → newest.
//!
//! Records whose timestamp cannot be parsed sort before every parseable one,
//! so a recent record with a broken timestamp is the first to leave a full
//! window. See DESIGN.md.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::DecisionRecord;

/// Records kept per instrument unless configured otherwise.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Per-instrument decision windows keyed by instrument id.
pub type HistoryWindows = HashMap<String, Vec<DecisionRecord>>;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a journal timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    let s = raw.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Bucket `records` by instrument and keep the trailing `window` of each.
///
/// The sort is stable, so records with equal (or equally unparseable)
/// timestamps keep their journal order.
pub fn group_history(records: &[Value], window: usize) -> HistoryWindows {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &str, &Value)> = records
        .iter()
        .filter_map(|raw| {
            let symbol = DecisionRecord::instrument_of(raw)?;
            Some((raw.get("timestamp").and_then(parse_timestamp), symbol, raw))
        })
        .collect();

    let dropped = records.len() - keyed.len();
    if dropped > 0 {
        debug!(dropped, "journal records without symbol skipped");
    }

    // None < Some(_): unparseable timestamps lead.
    keyed.sort_by_key(|(ts, _, _)| *ts);

    let mut buckets: HashMap<String, Vec<&Value>> = HashMap::new();
    for (_, symbol, raw) in keyed {
        buckets.entry(symbol.to_string()).or_default().push(raw);
    }

    buckets
        .into_iter()
        .map(|(symbol, raws)| {
            let start = raws.len().saturating_sub(window);
            let kept = raws[start..].iter().map(|raw| DecisionRecord::from_raw(raw)).collect();
            (symbol, kept)
        })
        .collect()
}
