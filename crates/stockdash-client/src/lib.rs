//! Asynchronous data orchestration for the stock dashboard
//!
//! This crate is the client-side orchestration layer of the dashboard:
//! the two places where concurrent work must be sequenced and
//! cancelled correctly against a mutable view of "the current
//! subject".
//!
//! - **Push side**: [`TaskSession`] owns one streaming [`Transport`]
//!   at a time and folds its ordered event stream into an
//!   [`AnalysisView`] (status, progress, append-only message log,
//!   terminal report or failure).
//! - **Pull side**: [`FetchOrchestrator`] fans out one base-series
//!   request plus one request per indicator for a subject, aligns the
//!   results positionally, caches the merged set (FIFO, bounded), and
//!   discards cycles superseded by a newer request epoch.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockdash_client::{
//!     ApiClient, ClientConfig, FetchOrchestrator, TaskSession, WsTransportFactory,
//! };
//! use stockdash_models::{Period, Subject};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default();
//!     let api = Arc::new(ApiClient::new(config.clone())?);
//!
//!     // Stream one analysis run to completion.
//!     let transports = Arc::new(WsTransportFactory::new(config.ws_base.clone()));
//!     let mut session = TaskSession::new(api.clone(), transports, config.analysis_type.clone());
//!     session.start("600519").await?;
//!     let view = session.run().await;
//!     println!("{:?}", view.report);
//!
//!     // Load the merged indicator set for the same stock.
//!     let orchestrator = FetchOrchestrator::new(api);
//!     let outcome = orchestrator.load(&Subject::new("600519", Period::Daily)).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod epoch;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use api::{AnalysisBackend, ApiClient, MarketData};
pub use cache::{CACHE_CAPACITY, ResultCache};
pub use config::ClientConfig;
pub use epoch::RequestEpoch;
pub use error::{ClientError, Result};
pub use orchestrator::{FetchOrchestrator, LoadOutcome};
pub use session::{AnalysisView, FailureKind, SessionState, SessionStep, TaskSession};
pub use transport::{Transport, TransportEvent, TransportFactory, WsTransport, WsTransportFactory};
