//! Pegasus Core - aggregation and change detection for multi-source OSINT
//!
//! This crate turns partial, error-prone collector output into:
//! - A unified intelligence profile with confidence and risk scores
//! - Comparable snapshots and typed, severity-ranked change sets
//! - Per-target tracking profiles with an append-only change history
//!
//! Nothing here performs network or file I/O. Every builder is a pure
//! function over an immutable [`SourceResultStore`].

pub mod sources;
pub mod profile;
pub mod snapshot;
pub mod diff;
pub mod alerts;
pub mod tracking;
pub mod target;
pub mod config;

pub use sources::*;
pub use profile::*;
pub use snapshot::*;
pub use diff::*;
pub use alerts::*;
pub use tracking::*;
pub use target::*;
pub use config::*;

/// Key that marks a nested collector result as failed
pub const ERROR_MARKER: &str = "error";

/// Placeholder collectors emit when a lookup returned nothing useful
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Upper bound for risk and confidence scores
pub const MAX_SCORE: u8 = 100;

/// Recheck interval for social profiles (1 hour)
pub const SOCIAL_CHECK_INTERVAL_SECS: u64 = 3_600;

/// Recheck interval for domains (1 day)
pub const DOMAIN_CHECK_INTERVAL_SECS: u64 = 86_400;

/// Recheck interval for email addresses (1 week)
pub const EMAIL_CHECK_INTERVAL_SECS: u64 = 604_800;

/// Default per-collector timeout used by the runtime
pub const DEFAULT_COLLECTOR_TIMEOUT_SECS: u64 = 30;
