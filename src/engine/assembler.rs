//! # engine::assembler
//!
//! Composes the snapshot, the precision table and the decision windows into
//! one [`Payload`].
//!
//! ```text
//! MarketSnapshot ──┬── account ─────────────────────────▶ AccountBlock
//!                  └── symbols[i] ──┬── realtime/position ▶ InstrumentContext
//!                                   └── timeframes[tf] ──▶ TimeframeBlock (per tf, config order)
//! HistoryWindows ──────────────────────────────────────────▶ decision_history
//! PrecisionTable ──▶ every price / qty rounding
//! ```
//!
//! Pure: the only clock-dependent value (`meta.now`) is passed in.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::engine::history::{HistoryWindows, DEFAULT_HISTORY_WINDOW};
use crate::engine::timeframe::build_timeframe_block;
use crate::models::{
    AccountBlock, AccountSummary, InstrumentContext, InstrumentSnapshot, MarketSnapshot, Meta,
    Payload, PositionRules, PositionSnapshot, PositionView, RiskHints, Side,
};
use crate::numeric::round_dp;
use crate::precision::PrecisionTable;

pub const DEFAULT_TIMEFRAMES: &[&str] = &["3m", "5m", "15m", "1h", "4h", "1d"];
pub const DEFAULT_VENUE: &str = "Binance Perp (USDT-M)";
pub const DEFAULT_QUOTE_ASSET: &str = "USDT";

/// `meta.now` layout.
pub const NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FUNDING_DECIMALS: u32 = 6;
const OPEN_INTEREST_DECIMALS: u32 = 0;
const PNL_DECIMALS: u32 = 4;
const MONEY_DECIMALS: u32 = 2;
const RULE_DECIMALS: u32 = 4;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Static risk hints echoed into the `account` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskRules {
    pub stop_loss_default_percent: f64,
    pub take_profit_default_percent: f64,
    pub min_position_percent: f64,
    pub max_position_percent: f64,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            stop_loss_default_percent: 2.0,
            take_profit_default_percent: 5.0,
            min_position_percent: 10.0,
            max_position_percent: 30.0,
        }
    }
}

/// Everything the assembler needs besides the data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblerConfig {
    /// Priority order; labels must match the snapshot keys exactly.
    pub timeframes: Vec<String>,
    pub history_window: usize,
    pub venue: String,
    pub quote_asset: String,
    pub risk: RiskRules,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            timeframes: DEFAULT_TIMEFRAMES.iter().map(|s| s.to_string()).collect(),
            history_window: DEFAULT_HISTORY_WINDOW,
            venue: DEFAULT_VENUE.to_string(),
            quote_asset: DEFAULT_QUOTE_ASSET.to_string(),
            risk: RiskRules::default(),
        }
    }
}

// ─── Pieces ───────────────────────────────────────────────────────────────────

/// `"BTCUSDT"` → `"BTC/USDT"`; anything not ending in the quote asset is kept.
pub fn market_label(symbol: &str, quote_asset: &str) -> String {
    match symbol.strip_suffix(quote_asset) {
        Some(base) if !base.is_empty() && !quote_asset.is_empty() => format!("{base}/{quote_asset}"),
        _ => symbol.to_string(),
    }
}

/// Explicit `LONG`/`SHORT` wins; otherwise the sign of the amount decides.
pub fn position_side(position: &PositionSnapshot) -> Side {
    match position.side_label().map(str::to_ascii_uppercase).as_deref() {
        Some("LONG") => Side::Long,
        Some("SHORT") => Side::Short,
        _ if position.position_amt > 0.0 => Side::Long,
        _ => Side::Short,
    }
}

fn position_view(symbol: &str, position: &PositionSnapshot, precision: &PrecisionTable) -> PositionView {
    PositionView {
        side: position_side(position),
        position_amt: precision.round_qty(symbol, position.position_amt),
        entry_price: precision.round_price(symbol, position.entry_price),
        leverage: position.leverage,
        unrealized_pnl: round_dp(position.unrealized_pnl, PNL_DECIMALS),
        pnl_percent: round_dp(position.pnl_percent, PNL_DECIMALS),
        isolated_margin: round_dp(position.isolated_margin, PNL_DECIMALS),
        update_time: position.update_time,
    }
}

fn account_block(account: &AccountSummary, risk: &RiskRules) -> AccountBlock {
    AccountBlock {
        equity: round_dp(account.equity, MONEY_DECIMALS),
        available_balance: round_dp(account.available_balance, MONEY_DECIMALS),
        total_unrealized_pnl: round_dp(account.total_unrealized_pnl, MONEY_DECIMALS),
        risk: RiskHints {
            default_stop_loss_percent: round_dp(risk.stop_loss_default_percent, RULE_DECIMALS),
            default_take_profit_percent: round_dp(risk.take_profit_default_percent, RULE_DECIMALS),
        },
        position_rules: PositionRules {
            min_position_percent: round_dp(risk.min_position_percent, RULE_DECIMALS),
            max_position_percent: round_dp(risk.max_position_percent, RULE_DECIMALS),
        },
    }
}

fn instrument_context(
    instrument: &InstrumentSnapshot,
    history: &HistoryWindows,
    precision: &PrecisionTable,
    config: &AssemblerConfig,
) -> InstrumentContext {
    let symbol = instrument.symbol.as_str();
    let price_dp = precision.price_decimals(symbol);
    let funding = round_dp(instrument.realtime.funding_rate, FUNDING_DECIMALS);

    let market_data = config
        .timeframes
        .iter()
        .filter_map(|tf| match instrument.timeframes.get(tf) {
            Some(bars) => Some(build_timeframe_block(tf, bars, price_dp, funding)),
            None => {
                debug!(symbol, time_frame = %tf, "timeframe missing from snapshot — skipped");
                None
            }
        })
        .collect();

    InstrumentContext {
        market: market_label(symbol, &config.quote_asset),
        funding,
        open_interest: round_dp(instrument.realtime.open_interest, OPEN_INTEREST_DECIMALS),
        current_price: round_dp(instrument.realtime.price, price_dp),
        position: instrument
            .position
            .as_ref()
            .map(|p| position_view(symbol, p, precision)),
        market_data,
        decision_history: history.get(symbol).cloned().unwrap_or_default(),
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Build the payload for one cycle. Symbols keep their snapshot order.
pub fn build_payload(
    snapshot: &MarketSnapshot,
    history: &HistoryWindows,
    precision: &PrecisionTable,
    config: &AssemblerConfig,
    now: NaiveDateTime,
) -> Payload {
    Payload {
        meta: Meta {
            now: now.format(NOW_FORMAT).to_string(),
            exchange: config.venue.clone(),
        },
        account: snapshot
            .account
            .as_ref()
            .map(|a| account_block(a, &config.risk)),
        symbols: snapshot
            .symbols
            .iter()
            .map(|s| instrument_context(s, history, precision, config))
            .collect(),
    }
}
