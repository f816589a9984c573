//! pulse-core
//!
//! Core traits, data model, and lifecycle primitives shared across the
//! Pulse realtime market-data workspace.
//!
//! - `adapter`: the `UpstreamClient` transport trait and `SourceAdapter`
//!   normalization trait connectors implement.
//! - `calendar`: the `TradingCalendar` trait gating scheduler cadence.
//! - `lifecycle`: `EngineHandle`, the graceful-shutdown task handle.
//! - `model`: shared data model types (`PoolEntry`) used by the pool and
//!   scheduler.
#![warn(missing_docs)]

pub mod adapter;
pub mod calendar;
pub mod lifecycle;
pub mod model;

pub use adapter::{DefaultAdapter, RawReading, SourceAdapter, UpstreamClient};
pub use calendar::{ShanghaiShenzhenCalendar, TradingCalendar};
pub use lifecycle::{Abortable, EngineHandle, Stoppable};
pub use model::PoolEntry;
