use pulse_types::EngineError;
use thiserror::Error;

/// Errors specific to the scrape bus and session bookkeeping, convertible
/// into the workspace-wide [`EngineError`] at call boundaries.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The Redis connection or a command against it failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A task or result payload failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<ScraperError> for EngineError {
    fn from(value: ScraperError) -> Self {
        match value {
            ScraperError::Redis(e) => Self::transient("scrape", e.to_string()),
            ScraperError::Serde(e) => Self::permanent("scrape", e.to_string()),
        }
    }
}
