//! NLNOG Ring Prometheus exporter binary: wires configuration, the fleet
//! session core, and the HTTP surface together, then serves until a
//! shutdown signal arrives.

mod metrics;
mod routes;
mod state;

use std::env;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use catalog::CatalogClient;
use dotenvy::dotenv;
use fleet_config::Settings;
use fleet_core::{NodeManager, ProbeExecutor};
use node_cache::NodeCacheStore;
use runner::TokioRunner;
use session::SessionManager;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use state::AppState;

const NODE_CACHE_PATH: &str = "/tmp/ssh-control/node_cache.json";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Arc::new(Settings::from_env()?);
    let runner: Arc<dyn runner::Runner> = Arc::new(TokioRunner);

    config.log_startup_banner(runner.as_ref()).await;

    let catalog = CatalogClient::new(
        config.nlnog_api.clone(),
        config.nlnog_participants_api.clone(),
        config.nlnog_api_timeout,
    );
    let cache = NodeCacheStore::new(NODE_CACHE_PATH);
    let sessions = Arc::new(SessionManager::new(config.clone(), runner.clone()));
    let node_manager = Arc::new(NodeManager::new(
        config.clone(),
        sessions.clone(),
        catalog,
        cache,
    ));
    let probe_executor = Arc::new(ProbeExecutor::new(config.clone(), runner.clone()));

    let refresh_manager = node_manager.clone();
    let refresh_task = tokio::spawn(async move {
        refresh_manager.refresh_loop().await;
    });

    let state = AppState {
        node_manager: node_manager.clone(),
        probe_executor,
        config: config.clone(),
    };

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/probe", get(routes::probe))
        .route("/api/filter-options", get(routes::filter_options))
        .route("/health", get(routes::health))
        .route("/sessions", get(routes::sessions))
        .route("/debug", get(routes::debug))
        .route("/internal/metrics", get(routes::internal_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "NLNOG Ring exporter listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    node_manager.shutdown().await;
    refresh_task.abort();

    info!("exporter shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            warn!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            warn!("received SIGTERM, starting graceful shutdown");
        }
    }
}
