//! pulse-middleware
//!
//! Composable middleware wrapping `pulse-core::UpstreamClient` transports:
//!
//! - `quota`: per-source rate limiting (`QuotaGate`), supporting both a
//!   fixed interval and a rolling per-minute window.
//! - `blacklist`: a per-source skip-list (`Skiplist`) for codes that failed
//!   permanently, cleared once the staleness window reopens.
#![warn(missing_docs)]

pub mod blacklist;
pub mod quota;

pub use blacklist::Skiplist;
pub use quota::{QuotaGate, QuotaStrategy};
