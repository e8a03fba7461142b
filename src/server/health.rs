use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::AppState;

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "queue_backlog": state.queue.backlog(),
            "in_flight": state.queue.in_flight(),
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
