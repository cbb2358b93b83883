//! # market — Market Snapshot source
//!
//! Everything the pipeline describes comes from one [`MarketSnapshot`] per cycle.
//!
//! ## Data Sources
//! 1. Snapshot file written by the exchange collector, if `MARKET_SNAPSHOT_PATH` is set
//! 2. Mock: a deterministic synthetic market, for dev/test without an exchange

use std::collections::HashMap;
use std::path::Path;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ContextError, Result};
use crate::models::{AccountSummary, Bar, InstrumentSnapshot, MarketSnapshot, PositionSnapshot, RealtimeQuote};
use crate::precision::SymbolFilters;

/// Read the snapshot document at `path`.
pub async fn load_snapshot(path: &Path) -> Result<MarketSnapshot> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ContextError::io(path, e))?;
    let snapshot: MarketSnapshot =
        serde_json::from_str(&text).map_err(|e| ContextError::json(path, e))?;

    debug!(
        path = %path.display(),
        symbols = snapshot.symbols.len(),
        account = snapshot.account.is_some(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Snapshot file if configured, otherwise the mock.
pub async fn fetch_snapshot(config: &Config) -> Result<MarketSnapshot> {
    match &config.snapshot_path {
        Some(path) => load_snapshot(path).await,
        None => {
            warn!("MARKET_SNAPSHOT_PATH not set — using MOCK market data");
            Ok(mock_snapshot(&config.timeframes))
        }
    }
}

// ─── Mock ─────────────────────────────────────────────────────────────────────

const MOCK_BARS: usize = 120;
const T0_MS: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z
const MINUTE_MS: i64 = 60_000;

/// Bar spacing in minutes for labels like `"3m"`, `"4h"`, `"1d"`.
/// Unknown or oversized labels fall back to 1.
fn timeframe_minutes(label: &str) -> i64 {
    let Some((idx, _)) = label.char_indices().last() else {
        return 1;
    };
    let (num, unit) = label.split_at(idx);
    let n: i64 = num.parse().unwrap_or(1);
    let minutes = match unit {
        "m" => Some(n),
        "h" => n.checked_mul(60),
        "d" => n.checked_mul(1440),
        "w" => n.checked_mul(10_080),
        _ => None,
    };
    minutes.filter(|m| *m > 0).unwrap_or(1)
}

/// Smooth oscillation around `base` with a slow drift. Same input, same bars.
fn mock_bars(base: f64, label: &str) -> Vec<Bar> {
    // last timestamp must fit in i64
    let step_ms = timeframe_minutes(label)
        .checked_mul(MINUTE_MS)
        .filter(|step| {
            step.checked_mul(MOCK_BARS as i64)
                .and_then(|span| span.checked_add(T0_MS))
                .is_some()
        })
        .unwrap_or(MINUTE_MS);
    let amplitude = base * 0.01;

    (0..MOCK_BARS)
        .map(|i| {
            let x = i as f64;
            let open = base + amplitude * (x / 7.0).sin() + x * base * 0.0002;
            let close = base + amplitude * ((x + 1.0) / 7.0).sin() + (x + 1.0) * base * 0.0002;
            let wick = amplitude * 0.3 * (1.0 + (x / 3.0).cos().abs());
            Bar::new(
                T0_MS + i as i64 * step_ms,
                open,
                open.max(close) + wick,
                open.min(close) - wick,
                close,
                1_000.0 + 250.0 * (x / 5.0).sin().abs(),
            )
        })
        .collect()
}

fn mock_instrument(symbol: &str, base: f64, tick: &str, step: &str, timeframes: &[String]) -> InstrumentSnapshot {
    let bars: HashMap<String, Vec<Bar>> = timeframes
        .iter()
        .map(|tf| (tf.clone(), mock_bars(base, tf)))
        .collect();
    // Closes do not depend on the bar spacing, so every timeframe ends here.
    let price = mock_bars(base, "1m").last().map_or(base, |b| b.close);

    InstrumentSnapshot {
        symbol: symbol.to_string(),
        filters: SymbolFilters {
            tick_size: json!(tick),
            step_size: json!(step),
            ..Default::default()
        },
        realtime: RealtimeQuote {
            price,
            funding_rate: 0.0001,
            open_interest: base * 1.5,
        },
        position: None,
        timeframes: bars,
    }
}

/// Mock data for development: BTCUSDT with a small long, ETHUSDT flat.
pub fn mock_snapshot(timeframes: &[String]) -> MarketSnapshot {
    let mut btc = mock_instrument("BTCUSDT", 67_000.0, "0.10", "0.001", timeframes);
    btc.position = Some(PositionSnapshot {
        side: json!("LONG"),
        position_amt: 0.015,
        entry_price: 66_500.0,
        leverage: 5.0,
        unrealized_pnl: 7.5,
        pnl_percent: 0.75,
        isolated_margin: 199.5,
        update_time: 1_735_689_600_000,
    });
    let eth = mock_instrument("ETHUSDT", 3_400.0, "0.01", "0.001", timeframes);

    MarketSnapshot {
        account: Some(AccountSummary {
            equity: 1_000.0,
            available_balance: 800.5,
            total_unrealized_pnl: 7.5,
        }),
        symbols: vec![btc, eth],
    }
}
