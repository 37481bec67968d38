//! Common traits for collectors

use async_trait::async_trait;
use pegasus_core::{SourceKind, Target};
use serde_json::Value;
use thiserror::Error;

/// Errors from collector operations
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Collector unavailable: {0}")]
    Unavailable(String),
}

/// Common interface for everything that fills one source of the store.
///
/// Collectors own all I/O, retries and backoff. A collector that can partly
/// answer should return what it has and put `{"error": ...}` in the failed
/// sub-results rather than failing the whole call.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Unique collector identifier
    fn id(&self) -> &str;

    /// Source this collector fills
    fn source(&self) -> SourceKind;

    /// Gather results for a target
    async fn collect(&self, target: &Target) -> Result<Value, CollectorError>;
}

/// Replays a previously captured result
pub struct ReplayCollector {
    id: String,
    source: SourceKind,
    result: Value,
}

impl ReplayCollector {
    pub fn new(source: SourceKind, result: Value) -> Self {
        Self {
            id: format!("replay-{source}"),
            source,
            result,
        }
    }
}

#[async_trait]
impl Collector for ReplayCollector {
    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> SourceKind {
        self.source
    }

    async fn collect(&self, _target: &Target) -> Result<Value, CollectorError> {
        Ok(self.result.clone())
    }
}
