//! pulse-scraper
//!
//! Bridges the Pulse engine to an out-of-process headless-browser worker
//! pool over a Redis task bus.
//!
//! - `bus`: wire types (`ScrapeTask`, `ScrapeResult`) and the `ScraperBus`
//!   trait, with a Redis-backed implementation (`RedisBus`).
//! - `session`: the `FetchSession` state machine tracking one outstanding
//!   batch across retries.
//! - `coordinator`: `Coordinator`, which issues sessions, drains results,
//!   and sweeps timed-out sessions for retry.
//! - `error`: `ScraperError`, convertible into `pulse_types::EngineError`.
#![warn(missing_docs)]

pub mod bus;
pub mod coordinator;
pub mod error;
pub mod session;

pub use bus::{RedisBus, ResultStatus, ScrapeResult, ScrapeTask, ScrapedQuote, ScraperBus};
pub use coordinator::Coordinator;
pub use error::ScraperError;
pub use session::{FetchSession, Priority, SessionState};
