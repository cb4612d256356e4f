//! HTTP server for qplannerd.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use qkd_common::types::ClockModel;

use crate::routes;

/// State shared across handlers: the last pushed clock model. Updates are
/// rare; planning reads whatever was pushed most recently.
pub struct AppState {
    pub clock: RwLock<ClockModel>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            clock: RwLock::new(ClockModel::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::planner_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the process is terminated.
pub async fn run(listen: &str) -> Result<()> {
    let app = router(Arc::new(AppState::new()));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
