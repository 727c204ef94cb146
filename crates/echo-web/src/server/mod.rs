//! Web server — Axum router + shared state.

pub mod api;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use echo_core::config::Config;
use echo_core::pipeline::AnalysisPipeline;

/// Shared application state. One journal per process.
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::very_permissive();

    Router::new()
        .merge(api::routes())
        .merge(ws::routes())
        .layer(cors)
        .with_state(state)
}
