//! Domain models shared across the context pipeline.

pub mod bar;
pub mod decision;
pub mod payload;
pub mod snapshot;

pub use bar::Bar;
pub use decision::{normalize_confidence, ConfidenceLabel, DecisionRecord};
pub use payload::{
    AccountBlock, InstrumentContext, Meta, OhlcRow, Payload, PositionRules, PositionView,
    RiskHints, Side, TimeframeBlock,
};
pub use snapshot::{AccountSummary, InstrumentSnapshot, MarketSnapshot, PositionSnapshot, RealtimeQuote};
