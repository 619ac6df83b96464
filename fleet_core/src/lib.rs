//! The fleet session core.
//!
//! Owns the authoritative node roster and health map, drives the background
//! refresh loop, answers filter-balanced sampling queries, and executes the
//! per-node remote ping. Everything else in the workspace (the HTTP surface,
//! metrics serialization, configuration loading) is a collaborator that
//! talks to this crate through [`NodeManager`] and [`ProbeExecutor`].

mod node_manager;
mod probe;

pub use node_manager::{
    FilterField, HealthSnapshot, HealthState, HealthSummary, LastStatus, NodeManager,
    SessionSnapshot,
};
pub use probe::{is_valid_target, sanitize_target, ProbeExecutor, ProbeOutcome, ProbeResult, RttStats};
