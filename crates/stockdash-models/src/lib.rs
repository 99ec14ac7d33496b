//! Data model and wire types for the stockdash client
//!
//! This crate holds the plain data shapes shared by the streaming
//! analysis session and the indicator fetch orchestrator:
//!
//! - Analysis-side types: task, agent roles, streamed agent messages,
//!   and the terminal report
//! - Market-side types: subject (stock code + period), K-line bars,
//!   indicator identifiers and their per-indicator wire shapes
//! - The streaming message envelope spoken over the analysis channel
//!
//! No I/O lives here; everything is serde-serializable plain data.

pub mod analysis;
pub mod market;
pub mod stream;

pub use analysis::{
    AgentMessage, AgentRole, AnalysisReport, AnalysisStatus, AnalysisTask, TaskHandle,
};
pub use market::{Indicator, IndicatorSeries, IndicatorSet, Kline, Period, Subject};
pub use stream::{StatusPayload, StreamMessage};
