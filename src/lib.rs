//! # aitrade-context — decision context for the trading model
//!
//! Turns one market snapshot (bars per timeframe, live quote, position,
//! account) plus the decision journal into the JSON document the model reads
//! each cycle.
//!
//! ```text
//!  snapshot ─┬─ filters ──▶ precision::PrecisionTable ─────────┐
//!            ├─ bars ─────▶ engine::timeframe (indicators,     │
//!            │               patterns, ohlc) ──────────────────┤
//!            └─ quote / position / account ────────────────────┼─▶ engine::assembler ─▶ Payload
//!  journal ───────────────▶ engine::history (per-symbol window)┘                         │
//!                                                                                        ▼
//!                                                                               prompt::build_prompt
//! ```
//!
//! Everything under [`engine`] is pure and never fails; file access lives in
//! [`journal`] and [`market`].

pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod market;
pub mod models;
pub mod numeric;
pub mod precision;
pub mod prompt;

pub use config::Config;
pub use engine::{build_payload, group_history, AssemblerConfig, HistoryWindows, RiskRules};
pub use error::ContextError;
pub use models::Payload;
pub use precision::{PrecisionDefaults, PrecisionTable};
