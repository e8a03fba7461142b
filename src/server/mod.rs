pub mod health;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::clock::Clock;
use crate::generate::Orchestrator;
use crate::limiter::RateLimiter;
use crate::models::{BackgroundCatalog, ServiceConfig};
use crate::queue::JobQueue;
use crate::registry::{KioskStatsBoard, SessionRegistry};

/// Multipart framing overhead allowed on top of the image size limit.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Shared application state for the Axum server.
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub limiter: Arc<RateLimiter>,
    pub queue: Arc<JobQueue>,
    pub registry: Arc<SessionRegistry>,
    pub stats: Arc<KioskStatsBoard>,
    pub orchestrator: Arc<Orchestrator>,
    pub catalog: Arc<BackgroundCatalog>,
    pub clock: Arc<dyn Clock>,
    pub output_dir: PathBuf,
    pub start_time: Instant,
}

/// Create the Axum router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + BODY_LIMIT_SLACK;
    let output_dir = state.output_dir.clone();
    Router::new()
        .route("/api/generate", post(routes::generate))
        .route("/api/backgrounds", get(routes::list_backgrounds))
        .route("/api/monitor", get(routes::monitor))
        .route("/api/kiosk/{kiosk_id}/status", get(routes::kiosk_status))
        .route("/api/health", get(health::health_check))
        .nest_service("/outputs", ServeDir::new(output_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
