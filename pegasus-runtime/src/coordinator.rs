//! Collector coordinator
//!
//! Dispatches every registered collector concurrently and waits for all of
//! them before building the store. The core only ever sees a complete,
//! immutable store:
//! - Collectors for distinct sources run independently
//! - A failing or slow collector leaves only its own source absent
//! - The store is stamped once, after the join

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use pegasus_core::{RuntimeConfig, SourceResultStore, Target};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{Collector, CollectorError};

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound for a single collector call
    pub collector_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for CoordinatorConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            collector_timeout: Duration::from_secs(config.collector_timeout_secs),
        }
    }
}

/// Runs collectors and joins their results into one store
pub struct Coordinator {
    collector_timeout: Duration,
    collectors: Vec<Box<dyn Collector>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            collector_timeout: config.collector_timeout,
            collectors: Vec::new(),
        }
    }

    /// Register a collector. If two collectors fill the same source, the one
    /// registered last wins.
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        debug!(
            "Registered collector {} for {}",
            collector.id(),
            collector.source()
        );
        self.collectors.push(collector);
    }

    pub fn with_collector(mut self, collector: Box<dyn Collector>) -> Self {
        self.register(collector);
        self
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector against the target and join the results
    pub async fn run(&self, target: &Target) -> SourceResultStore {
        info!(
            "Collecting {} with {} collectors",
            target,
            self.collectors.len()
        );

        let limit = self.collector_timeout;
        let calls = self.collectors.iter().map(|collector| async move {
            let outcome = match timeout(limit, collector.collect(target)).await {
                Ok(result) => result,
                Err(_) => Err(CollectorError::Timeout(limit.as_secs())),
            };
            (collector, outcome)
        });
        let outcomes = join_all(calls).await;

        let mut store = SourceResultStore::new(Utc::now());
        for (collector, outcome) in outcomes {
            let source = collector.source();
            match outcome {
                Ok(value) => {
                    if store.contains(source) {
                        warn!(
                            "Collector {} replaces an earlier {} result",
                            collector.id(),
                            source
                        );
                    }
                    if let Err(e) = store.insert(source, value) {
                        warn!("Collector {} returned unusable data: {}", collector.id(), e);
                    }
                }
                Err(e) => {
                    warn!("Collector {} failed: {}", collector.id(), e);
                }
            }
        }

        info!(
            "Collection finished: {}/{} sources present",
            store.len(),
            self.collectors.len()
        );
        store
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
