//! pulse-types
//!
//! Shared data transfer objects, configuration, and error types used across
//! the Pulse realtime market-data workspace.
//!
//! - `stock`: the `StockCode`/`Exchange` domain identifiers.
//! - `caller`: the closed `CallerTag`/`Dashboard` enums used for interest
//!   attribution and refresh routing.
//! - `quote`: the `Quote` value type and its wire representation.
//! - `config`: configuration structs loaded once at startup.
//! - `error`: the unified `EngineError` type.
#![warn(missing_docs)]

pub mod caller;
pub mod config;
pub mod error;
pub mod quote;
pub mod stock;

pub use caller::{CallerTag, Dashboard};
pub use config::{
    EngineConfig, PoolConfig, QueueConfig, ScrapeTimeouts, ScraperConfig, ServerConfig,
    SourceConfig, SourceLimits, UpdateInterval,
};
pub use error::EngineError;
pub use quote::{Quote, RealtimeQuoteWire, derive_change_pct, round_two_places};
pub use stock::{Exchange, StockCode};
