//! pulse-sources
//!
//! Concrete `pulse_core::UpstreamClient` implementations:
//!
//! - `fast`: per-code HTTP GET with primary/backup URL fallback, paced by a
//!   fixed interval.
//! - `slow`: comma-joined batch HTTP GET, paced by a per-minute window
//!   quota.
//! - `scrape`: a non-blocking forwarder onto the `pulse-scraper` session
//!   coordinator.
#![warn(missing_docs)]

pub mod fast;
pub mod scrape;
pub mod slow;

pub use fast::FastClient;
pub use scrape::ScrapeClient;
pub use slow::SlowClient;
