use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the Pulse workspace.
///
/// Variant names mirror the closed error-kind table in the design: each
/// handling site matches on these explicitly rather than stringly-typed
/// errors, so a reviewer can see the whole error surface at a glance.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// Startup configuration failed to parse or validate. Fatal.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// HTTP timeout, 5xx, or connection reset from an upstream source.
    /// Absorbed by the scheduler's natural retry; the code stays expired.
    #[error("transient upstream failure for {source}: {msg}")]
    TransientUpstream {
        /// Name of the source that failed (`fast`, `slow`, `scrape`).
        source: String,
        /// Human-readable detail.
        msg: String,
    },

    /// 4xx or parse error from an upstream source. The code is skipped until
    /// its staleness window reopens.
    #[error("permanent upstream failure for {source}: {msg}")]
    PermanentUpstream {
        /// Name of the source that failed.
        source: String,
        /// Human-readable detail.
        msg: String,
    },

    /// A scrape session hit its deadline or closed with codes unreceived.
    #[error("scrape session {session_id} incomplete: {missing} codes not received")]
    ScrapeSessionIncomplete {
        /// Identifier of the incomplete session.
        session_id: String,
        /// Count of codes never received before the session closed.
        missing: usize,
    },

    /// A client's websocket send failed; the message is dropped for that
    /// client only and no retry is attempted.
    #[error("gateway emit failed for client {client_id}: {msg}")]
    GatewayEmitFailed {
        /// Identifier of the client session.
        client_id: String,
        /// Human-readable detail.
        msg: String,
    },

    /// Handler-level input validation failure (bad date, empty code list,
    /// malformed stock code). Never affects the pool.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested capability is not implemented by the target component.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A resource (code, session, dashboard) could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {0}")]
    ProviderTimeout(String),

    /// Opaque/unexpected error, used sparingly.
    #[error("unknown error: {0}")]
    Other(String),
}

impl EngineError {
    /// Build a [`Self::TransientUpstream`] for the named source.
    pub fn transient(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TransientUpstream {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`Self::PermanentUpstream`] for the named source.
    pub fn permanent(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PermanentUpstream {
            source: source.into(),
            msg: msg.into(),
        }
    }
}
