//! Pure analytics pipeline: bars in, [`crate::models::Payload`] out.

pub mod assembler;
pub mod history;
pub mod indicators;
pub mod patterns;
pub mod timeframe;

pub use assembler::{build_payload, AssemblerConfig, RiskRules};
pub use history::{group_history, HistoryWindows};
pub use timeframe::build_timeframe_block;
