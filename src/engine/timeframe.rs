//! # engine::timeframe
//!
//! Folds one timeframe's bars into a [`TimeframeBlock`]: scalar averages,
//! indicator series, candle tags and the recent OHLC rows.

use tracing::debug;

use crate::engine::indicators::{
    atr_last, bollinger_series, closes, ema_last, kdj_series, macd_series, rsi_series,
    sma_last, ATR_PERIOD, SERIES_LEN,
};
use crate::engine::patterns::detect_patterns;
use crate::models::{Bar, OhlcRow, TimeframeBlock};
use crate::numeric::round_dp;

const VOLUME_DECIMALS: u32 = 0;

/// Latest value rounded to `dp`, or `0.0` when the indicator is undefined.
fn scalar(value: Option<f64>, dp: u32) -> f64 {
    value.map_or(0.0, |v| round_dp(v, dp))
}

fn ohlc_rows(bars: &[Bar], price_dp: u32) -> Vec<OhlcRow> {
    let start = bars.len().saturating_sub(SERIES_LEN);
    bars[start..]
        .iter()
        .map(|b| OhlcRow {
            open: round_dp(b.open, price_dp),
            high: round_dp(b.high, price_dp),
            low: round_dp(b.low, price_dp),
            close: round_dp(b.close, price_dp),
            volume: round_dp(b.volume, VOLUME_DECIMALS),
        })
        .collect()
}

/// Build the block for `label`.
///
/// `funding` is the instrument's already rounded funding rate, repeated per
/// block. Never fails: each indicator degrades to `0.0` or an empty series on
/// its own.
pub fn build_timeframe_block(label: &str, bars: &[Bar], price_dp: u32, funding: f64) -> TimeframeBlock {
    let close = closes(bars);
    if close.len() < SERIES_LEN {
        debug!(time_frame = label, bars = close.len(), "short history — most indicators empty");
    }

    let macd = macd_series(&close);

    TimeframeBlock {
        time_frame: label.to_string(),
        ema20: scalar(ema_last(&close, 20), price_dp),
        ema50: scalar(ema_last(&close, 50), price_dp),
        sma20: scalar(sma_last(&close, 20), price_dp),
        sma50: scalar(sma_last(&close, 50), price_dp),
        atr14: scalar(atr_last(bars, ATR_PERIOD), price_dp),
        rsi: rsi_series(&close),
        macd: macd.macd,
        histogram: macd.histogram,
        kdj: kdj_series(bars),
        boll: bollinger_series(&close, price_dp),
        patterns: detect_patterns(bars),
        ohlc: ohlc_rows(bars, price_dp),
        funding,
    }
}
