//! # models::snapshot
//!
//! Input side of the pipeline: everything the upstream collaborators have
//! already fetched for one analysis cycle. Every numeric field is read through
//! [`crate::numeric`], so a half-filled exchange response still deserializes.
//!
//! Both snake_case and the exchange's camelCase keys are accepted.

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::Bar;
use crate::numeric::{lenient_f64, lenient_i64, null_as_default};
use crate::precision::SymbolFilters;

// ─── MarketSnapshot ───────────────────────────────────────────────────────────

/// One consistent snapshot of the market and account, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub account: Option<AccountSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbols: Vec<InstrumentSnapshot>,
}

impl MarketSnapshot {
    /// `(symbol, filters)` pairs for building a [`crate::precision::PrecisionTable`].
    pub fn filters(&self) -> impl Iterator<Item = (&str, &SymbolFilters)> {
        self.symbols.iter().map(|s| (s.symbol.as_str(), &s.filters))
    }
}

// ─── InstrumentSnapshot ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    /// Exchange symbol, e.g. `"BTCUSDT"`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,

    /// Tick/step metadata used for precision.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: SymbolFilters,

    #[serde(default, deserialize_with = "null_as_default")]
    pub realtime: RealtimeQuote,

    /// `None` when flat: missing, `null` or `{}`.
    #[serde(default, deserialize_with = "flat_when_empty")]
    pub position: Option<PositionSnapshot>,

    /// Bars per timeframe label (`"3m"`, `"1h"`, ...), oldest → newest.
    /// A `null` bar list is an empty one.
    #[serde(default, alias = "multi_timeframe", deserialize_with = "lenient_timeframes")]
    pub timeframes: HashMap<String, Vec<Bar>>,
}

fn flat_when_empty<'de, D>(deserializer: D) -> Result<Option<PositionSnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => PositionSnapshot::deserialize(value).map(Some).map_err(D::Error::custom),
    }
}

fn lenient_timeframes<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<Bar>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Option<Vec<Bar>>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(label, bars)| (label, bars.unwrap_or_default()))
        .collect())
}

/// Live quote: last price, funding and open interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    #[serde(default, alias = "lastPrice", deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, alias = "fundingRate", deserialize_with = "lenient_f64")]
    pub funding_rate: f64,
    #[serde(default, alias = "openInterest", deserialize_with = "lenient_f64")]
    pub open_interest: f64,
}

// ─── PositionSnapshot ─────────────────────────────────────────────────────────

/// Open position as reported by the exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// `"LONG"` / `"SHORT"` when the exchange says so; may be absent, empty or
    /// `"BOTH"` in one-way mode.
    #[serde(default)]
    pub side: Value,
    /// Signed amount: positive long, negative short.
    #[serde(default, alias = "positionAmt", deserialize_with = "lenient_f64")]
    pub position_amt: f64,
    #[serde(default, alias = "entryPrice", deserialize_with = "lenient_f64")]
    pub entry_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub leverage: f64,
    #[serde(default, alias = "unRealizedProfit", deserialize_with = "lenient_f64")]
    pub unrealized_pnl: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pnl_percent: f64,
    #[serde(default, alias = "isolatedMargin", deserialize_with = "lenient_f64")]
    pub isolated_margin: f64,
    #[serde(default, alias = "updateTime", deserialize_with = "lenient_i64")]
    pub update_time: i64,
}

impl PositionSnapshot {
    pub fn side_label(&self) -> Option<&str> {
        self.side.as_str().map(str::trim).filter(|s| !s.is_empty())
    }
}

// ─── AccountSummary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    #[serde(default, alias = "totalMarginBalance", deserialize_with = "lenient_f64")]
    pub equity: f64,
    #[serde(default, alias = "availableBalance", deserialize_with = "lenient_f64")]
    pub available_balance: f64,
    #[serde(default, alias = "totalUnrealizedProfit", deserialize_with = "lenient_f64")]
    pub total_unrealized_pnl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_accepts_exchange_shaped_input() {
        let snapshot: MarketSnapshot = serde_json::from_value(json!({
            "account": { "equity": "1000.126", "availableBalance": 800.0 },
            "symbols": [{
                "symbol": "ETHUSDT",
                "filters": { "tickSize": "0.01", "stepSize": "0.001" },
                "realtime": { "lastPrice": "3500.55", "fundingRate": "0.0001", "openInterest": null },
                "position": { "side": "", "positionAmt": "-0.5", "entryPrice": "3600" },
                "multi_timeframe": { "1h": [[0, "1", "2", "0.5", "1.5", "10"]] }
            }]
        }))
        .unwrap();

        let account = snapshot.account.unwrap();
        assert_eq!(account.equity, 1000.126);
        assert_eq!(account.available_balance, 800.0);
        assert_eq!(account.total_unrealized_pnl, 0.0);

        let eth = &snapshot.symbols[0];
        assert_eq!(eth.realtime.price, 3500.55);
        assert_eq!(eth.realtime.open_interest, 0.0);
        assert_eq!(eth.timeframes["1h"].len(), 1);

        let pos = eth.position.as_ref().unwrap();
        assert_eq!(pos.position_amt, -0.5);
        assert_eq!(pos.side_label(), None);
    }

    #[test]
    fn test_missing_sections_default() {
        let snapshot: MarketSnapshot = serde_json::from_value(json!({
            "symbols": [{ "symbol": "BTCUSDT", "position": null }]
        }))
        .unwrap();
        assert!(snapshot.account.is_none());
        assert!(snapshot.symbols[0].position.is_none());
        assert!(snapshot.symbols[0].timeframes.is_empty());
        assert_eq!(snapshot.filters().count(), 1);
    }

    #[test]
    fn test_null_sections_default() {
        let snapshot: MarketSnapshot = serde_json::from_value(json!({
            "account": null,
            "symbols": [{
                "symbol": "BTCUSDT",
                "filters": null,
                "realtime": null,
                "position": null,
                "timeframes": { "1h": null, "4h": [[0, "1", "2", "0.5", "1.5", "10"]] }
            }, {
                "symbol": "ETHUSDT",
                "filters": { "filters": null },
                "multi_timeframe": null
            }]
        }))
        .unwrap();

        let btc = &snapshot.symbols[0];
        assert_eq!(btc.filters, SymbolFilters::default());
        assert_eq!(btc.realtime, RealtimeQuote::default());
        assert!(btc.timeframes["1h"].is_empty());
        assert_eq!(btc.timeframes["4h"].len(), 1);

        let eth = &snapshot.symbols[1];
        assert!(eth.filters.filters.is_empty());
        assert!(eth.timeframes.is_empty());

        let empty: MarketSnapshot = serde_json::from_value(json!({ "symbols": null })).unwrap();
        assert!(empty.symbols.is_empty());
    }

    #[test]
    fn test_empty_position_object_is_flat() {
        let snapshot: MarketSnapshot = serde_json::from_value(json!({
            "symbols": [
                { "symbol": "BTCUSDT", "position": {} },
                { "symbol": "ETHUSDT", "position": { "positionAmt": "0.5" } }
            ]
        }))
        .unwrap();
        assert!(snapshot.symbols[0].position.is_none());
        assert_eq!(snapshot.symbols[1].position.as_ref().unwrap().position_amt, 0.5);
    }
}
