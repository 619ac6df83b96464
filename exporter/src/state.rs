//! Shared application state, threaded through every handler via `axum`'s
//! `State` extractor.

use std::sync::Arc;

use fleet_config::Settings;
use fleet_core::{NodeManager, ProbeExecutor};

/// Everything a route handler needs: the fleet core collaborators plus
/// resolved configuration.
#[derive(Clone)]
pub struct AppState {
    pub node_manager: Arc<NodeManager>,
    pub probe_executor: Arc<ProbeExecutor>,
    pub config: Arc<Settings>,
}
