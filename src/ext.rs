//! Pluggable edges of the access core: action throttling and audit emission.
//!
//! Both ship with in-process defaults ([`MemoryCounterStore`], [`MemoryAuditSink`]) and expose a
//! small trait so deployments can back them with shared infrastructure.

pub mod audit;
pub mod rate_limit;

pub use audit::*;
pub use rate_limit::*;
