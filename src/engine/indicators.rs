//! # engine::indicators
//!
//! Momentum, trend and volatility series computed over one timeframe's bars.
//!
//! Conventions shared by every function here:
//!
//! * input is oldest → newest, output is oldest → newest;
//! * a series is either complete (up to [`SERIES_LEN`] points) or empty when
//!   there is not enough history, never padded or partially filled;
//! * a non-finite result (overflow on absurd input) empties that one series
//!   and leaves the others alone.
//!
//! EMAs follow the `adjust = false` recurrence seeded with the first value,
//! RSI uses simple rolling means, Bollinger uses the population deviation.

use serde::Serialize;
use tracing::debug;

use crate::models::Bar;
use crate::numeric::round_dp;

/// Points emitted per series.
pub const SERIES_LEN: usize = 10;

pub const RSI_PERIOD: usize = 14;
/// Bars required before RSI and MACD are emitted at all.
pub const MOMENTUM_MIN_BARS: usize = 30;
pub const RSI_DECIMALS: u32 = 1;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const MACD_DECIMALS: u32 = 4;

pub const KDJ_PERIOD: usize = 9;
pub const KDJ_DECIMALS: u32 = 1;
/// Prior for both K and D.
pub const KDJ_SEED: f64 = 50.0;

pub const BOLL_PERIOD: usize = 20;
pub const BOLL_WIDTH: f64 = 2.0;

pub const ATR_PERIOD: usize = 14;

// ─── Output points ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KdjPoint {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub histogram: Vec<f64>,
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Round the last [`SERIES_LEN`] values; empty if any of them is non-finite.
fn finish_series(name: &str, values: &[f64], dp: u32) -> Vec<f64> {
    let last = tail(values, SERIES_LEN);
    if last.iter().any(|v| !v.is_finite()) {
        debug!(indicator = name, "non-finite value — series dropped");
        return Vec::new();
    }
    last.iter().map(|&v| round_dp(v, dp)).collect()
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

// ─── Moving averages ──────────────────────────────────────────────────────────

/// Full EMA series with `α = 2 / (span + 1)`, seeded with the first value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    values
        .iter()
        .scan(None::<f64>, |prev, &x| {
            let next = match *prev {
                None => x,
                Some(p) => alpha * x + (1.0 - alpha) * p,
            };
            *prev = Some(next);
            Some(next)
        })
        .collect()
}

/// Latest EMA, `None` with fewer than `span` values.
pub fn ema_last(values: &[f64], span: usize) -> Option<f64> {
    if span == 0 || values.len() < span {
        return None;
    }
    ema_series(values, span).last().copied().filter(|v| v.is_finite())
}

/// Latest simple moving average, `None` with fewer than `period` values.
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let mean = tail(values, period).iter().sum::<f64>() / period as f64;
    mean.is_finite().then_some(mean)
}

// ─── RSI ──────────────────────────────────────────────────────────────────────

/// RSI from average gain / average loss.
///
/// No losses saturates at 100; no movement at all is neutral 50.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// RSI(14) with simple rolling means of up- and down-moves.
///
/// Empty below [`MOMENTUM_MIN_BARS`] closes; otherwise the last 10 values at 1dp.
pub fn rsi_series(closes: &[f64]) -> Vec<f64> {
    if closes.len() < MOMENTUM_MIN_BARS {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period = RSI_PERIOD as f64;

    let values: Vec<f64> = deltas
        .windows(RSI_PERIOD)
        .map(|win| {
            let gain = win.iter().filter(|d| **d > 0.0).sum::<f64>() / period;
            let loss = -win.iter().filter(|d| **d < 0.0).sum::<f64>() / period;
            rsi_from_averages(gain, loss)
        })
        .collect();

    finish_series("rsi", &values, RSI_DECIMALS)
}

// ─── MACD ─────────────────────────────────────────────────────────────────────

/// MACD(12, 26, 9): line and histogram, last 10 of each at 4dp.
pub fn macd_series(closes: &[f64]) -> MacdSeries {
    if closes.len() < MOMENTUM_MIN_BARS {
        return MacdSeries::default();
    }

    let fast = ema_series(closes, MACD_FAST);
    let slow = ema_series(closes, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, MACD_SIGNAL);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(m, s)| m - s).collect();

    let macd = finish_series("macd", &line, MACD_DECIMALS);
    let histogram = finish_series("histogram", &histogram, MACD_DECIMALS);
    if macd.is_empty() || histogram.is_empty() {
        return MacdSeries::default();
    }
    MacdSeries { macd, histogram }
}

// ─── ATR ──────────────────────────────────────────────────────────────────────

/// Latest ATR with Wilder smoothing, seeded with the mean of the first
/// `period` true ranges. Needs `period + 1` bars.
pub fn atr_last(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let n = period as f64;
    let seed = ranges[..period].iter().sum::<f64>() / n;
    let atr = ranges[period..]
        .iter()
        .fold(seed, |atr, &tr| (atr * (n - 1.0) + tr) / n);

    atr.is_finite().then_some(atr)
}

// ─── KDJ ──────────────────────────────────────────────────────────────────────

/// Raw stochastic value of the last bar in `window`, clipped to `[0, 100]`.
/// A window with no range is neutral 50.
pub fn rsv(window: &[Bar]) -> f64 {
    let Some(last) = window.last() else {
        return KDJ_SEED;
    };
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let range = highest - lowest;

    if !range.is_finite() || range <= 0.0 {
        return KDJ_SEED;
    }
    let value = (last.close - lowest) / range * 100.0;
    if value.is_finite() { value.clamp(0.0, 100.0) } else { KDJ_SEED }
}

/// Smoothing state carried from bar to bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjState {
    pub k: f64,
    pub d: f64,
}

impl KdjState {
    pub const SEED: Self = Self { k: KDJ_SEED, d: KDJ_SEED };

    /// `K = ⅔·K₋₁ + ⅓·RSV`, `D = ⅔·D₋₁ + ⅓·K`.
    pub fn step(self, rsv: f64) -> Self {
        let k = (2.0 / 3.0) * self.k + (1.0 / 3.0) * rsv;
        let d = (2.0 / 3.0) * self.d + (1.0 / 3.0) * k;
        Self { k, d }
    }

    pub fn point(self) -> KdjPoint {
        KdjPoint { k: self.k, d: self.d, j: 3.0 * self.k - 2.0 * self.d }
    }
}

/// KDJ(9, 3, 3) over every bar, last 10 points at 1dp.
///
/// The first bars use the window available so far. Empty below
/// [`KDJ_PERIOD`] bars.
pub fn kdj_series(bars: &[Bar]) -> Vec<KdjPoint> {
    if bars.len() < KDJ_PERIOD {
        return Vec::new();
    }

    let points: Vec<KdjPoint> = (0..bars.len())
        .scan(KdjState::SEED, |state, i| {
            let window = &bars[(i + 1).saturating_sub(KDJ_PERIOD)..=i];
            *state = state.step(rsv(window));
            Some(state.point())
        })
        .collect();

    let last = tail(&points, SERIES_LEN);
    if last.iter().any(|p| !(p.k.is_finite() && p.d.is_finite() && p.j.is_finite())) {
        debug!(indicator = "kdj", "non-finite value — series dropped");
        return Vec::new();
    }
    last.iter()
        .map(|p| KdjPoint {
            k: round_dp(p.k, KDJ_DECIMALS),
            d: round_dp(p.d, KDJ_DECIMALS),
            j: round_dp(p.j, KDJ_DECIMALS),
        })
        .collect()
}

// ─── Bollinger ────────────────────────────────────────────────────────────────

/// Mean and population standard deviation.
fn mean_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Bollinger(20, 2) for the last 10 closes, rounded to `price_dp`.
///
/// Empty below [`BOLL_PERIOD`] closes. With fewer than 29 closes the leading
/// points are warm-up points: their window ends before the 20th close, so
/// their mean and deviation are computed over fewer than 20 closes.
pub fn bollinger_series(closes: &[f64], price_dp: u32) -> Vec<BollPoint> {
    if closes.len() < BOLL_PERIOD {
        return Vec::new();
    }

    let start = closes.len().saturating_sub(SERIES_LEN);
    let raw: Vec<BollPoint> = (start..closes.len())
        .map(|i| {
            let window = &closes[(i + 1).saturating_sub(BOLL_PERIOD)..=i];
            let (middle, std) = mean_std(window);
            BollPoint {
                upper: middle + BOLL_WIDTH * std,
                middle,
                lower: middle - BOLL_WIDTH * std,
            }
        })
        .collect();

    if raw.iter().any(|p| !(p.upper.is_finite() && p.lower.is_finite())) {
        debug!(indicator = "boll", "non-finite value — series dropped");
        return Vec::new();
    }
    raw.into_iter()
        .map(|p| BollPoint {
            upper: round_dp(p.upper, price_dp),
            middle: round_dp(p.middle, price_dp),
            lower: round_dp(p.lower, price_dp),
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
