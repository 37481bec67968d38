//! Pegasus Runtime
//!
//! The system around the core: collectors for each source run concurrently,
//! and the coordinator joins them into one immutable store before any
//! profile or snapshot is built.

pub mod collector;
pub mod coordinator;

pub use collector::*;
pub use coordinator::*;
