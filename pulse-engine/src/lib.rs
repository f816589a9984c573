//! pulse-engine
//!
//! The runtime core: the interest-set [`Pool`], the realtime [`Cache`], the
//! per-source [`Scheduler`], the subscription [`Gateway`], and the
//! [`Engine`] that wires them together with one shared shutdown switch.
#![warn(missing_docs)]

pub mod cache;
pub mod engine;
pub mod gateway;
pub mod ingress;
pub mod pool;
pub mod scheduler;

pub use cache::Cache;
pub use engine::Engine;
pub use gateway::{Gateway, QuoteBatch};
pub use ingress::Ingress;
pub use pool::Pool;
pub use scheduler::{CodeSelector, Scheduler};
