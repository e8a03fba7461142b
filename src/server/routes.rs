use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::clock::Clock;
use crate::errors::KioskError;
use crate::limiter::RateDecision;
use crate::models::{Gender, GenerationJob, GenerationOptions, Prominence};

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_response(status: StatusCode, error: &str, message: &str) -> impl IntoResponse {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

fn validation_response(message: String) -> axum::response::Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "validation_error",
        &KioskError::Validation(message).to_string(),
    )
    .into_response()
}

// ---------------------------------------------------------------------------
// Multipart submission
// ---------------------------------------------------------------------------

const KIOSK_HEADER: &str = "x-kiosk-id";

/// Kiosk ids end up in rate-limit keys, log lines, and artifact file
/// names, so only `[A-Za-z0-9_-]` is accepted. Anything else (including
/// a missing header) is treated as the anonymous "unknown" kiosk.
fn kiosk_id_from_headers(headers: &HeaderMap) -> String {
    let candidate = headers
        .get(KIOSK_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        candidate.to_string()
    } else {
        "unknown".to_string()
    }
}

#[derive(Debug, Default)]
struct Submission {
    image: Option<Vec<u8>>,
    mime: Option<String>,
    background_id: Option<String>,
    gender: Option<String>,
    prominence: Option<String>,
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, String> {
    let mut submission = Submission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("unreadable multipart body: {}", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                submission.mime = field.content_type().map(|m| m.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("unreadable image field: {}", e))?;
                submission.image = Some(bytes.to_vec());
            }
            "backgroundId" => {
                submission.background_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("unreadable backgroundId field: {}", e))?,
                );
            }
            "gender" => {
                submission.gender = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("unreadable gender field: {}", e))?,
                );
            }
            "prominence" => {
                submission.prominence = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("unreadable prominence field: {}", e))?,
                );
            }
            // Unknown fields are ignored so kiosk firmware can evolve first.
            _ => {}
        }
    }
    Ok(submission)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    let kiosk_id = kiosk_id_from_headers(&headers);

    // Admission gate 1: per-kiosk rate limit.
    if let RateDecision::Limited {
        key,
        retry_after_secs,
    } = state.limiter.check(&kiosk_id)
    {
        tracing::warn!("Rate limited kiosk '{}'", key);
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            &KioskError::RateLimited(format!(
                "kiosk '{}' exceeded the request limit, retry in {}s",
                key, retry_after_secs
            ))
            .to_string(),
        )
        .into_response();
    }

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!("Rejected submission from '{}': {}", kiosk_id, e);
            return validation_response(e);
        }
    };

    let image = match submission.image {
        Some(image) if !image.is_empty() => image,
        _ => {
            return validation_response(
                "an 'image' field with the selfie is required".to_string(),
            );
        }
    };
    if image.len() > state.config.max_upload_bytes {
        return validation_response(format!(
            "image exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        ));
    }
    let background_id = match submission.background_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return validation_response("a 'backgroundId' field is required".to_string());
        }
    };

    // Admission gate 2: queue backlog.
    let backlog = state.queue.backlog();
    if backlog > state.config.backlog_threshold {
        tracing::warn!(
            "Shedding request from '{}', backlog at {}",
            kiosk_id,
            backlog
        );
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "overloaded",
            &KioskError::Overloaded(backlog).to_string(),
        )
        .into_response();
    }

    let options = GenerationOptions {
        gender: submission
            .gender
            .as_deref()
            .map(Gender::parse)
            .unwrap_or(Gender::Female),
        prominence: submission
            .prominence
            .as_deref()
            .map(Prominence::parse)
            .unwrap_or(Prominence::Medium),
    };
    let priority = state.config.kiosks.get(&kiosk_id).copied().unwrap_or(0);
    let mime = submission
        .mime
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let job = GenerationJob::new(
        kiosk_id.clone(),
        image,
        mime,
        background_id,
        options,
        state.clock.now(),
        priority,
    );
    let session_id = job.id;
    let submitted_at = job.submitted_at;

    state.registry.open(&job).await;
    state.stats.record_submitted(&kiosk_id, submitted_at).await;
    tracing::info!(
        "Session {} from '{}' queued at priority {}",
        session_id,
        kiosk_id,
        priority
    );

    let orchestrator = Arc::clone(&state.orchestrator);
    let receiver = state
        .queue
        .add(priority, async move { orchestrator.execute(job).await });

    match receiver.await {
        Ok(Ok(outcome)) => {
            let elapsed_ms = (state.clock.now() - submitted_at).num_milliseconds().max(0);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "image": outcome.image,
                    "processing_time_ms": elapsed_ms,
                    "session_id": session_id,
                    "kiosk_id": kiosk_id,
                    "queue_backlog": state.queue.backlog(),
                })),
            )
                .into_response()
        }
        Ok(Err(e)) => {
            // Root cause stays in the server log; kiosks get a generic body.
            tracing::error!("Session {} failed: {}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "generation_failed",
                    "message": "Image generation failed, please try again",
                    "kiosk_id": kiosk_id,
                })),
            )
                .into_response()
        }
        Err(_) => {
            tracing::error!("Session {} was dropped before completion", session_id);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "generation_failed",
                "Image generation was interrupted, please try again",
            )
            .into_response()
        }
    }
}

/// GET /api/backgrounds
pub async fn list_backgrounds(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let categories: Vec<serde_json::Value> = state
        .catalog
        .grouped()
        .into_iter()
        .map(|(category, backgrounds)| {
            serde_json::json!({
                "category": category,
                "backgrounds": backgrounds,
            })
        })
        .collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "categories": categories })),
    )
}

/// GET /api/monitor
pub async fn monitor(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let recent = state
        .registry
        .recent(state.config.recent_sessions)
        .await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "kiosks": state.stats.snapshot().await,
            "queue_backlog": state.queue.backlog(),
            "in_flight": state.queue.in_flight(),
            "total_sessions": state.registry.len().await,
            "recent_sessions": recent,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "memory_bytes": resident_memory_bytes(),
            "timestamp": state.clock.now(),
        })),
    )
}

/// GET /api/kiosk/{kiosk_id}/status
pub async fn kiosk_status(
    State(state): State<Arc<AppState>>,
    Path(kiosk_id): Path<String>,
) -> impl IntoResponse {
    match state.stats.get(&kiosk_id).await {
        Some(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "kiosk_id": kiosk_id,
                "total": stats.total,
                "completed": stats.completed,
                "failed": stats.failed,
                "last_active": stats.last_active,
                "queue_backlog": state.queue.backlog(),
            })),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Kiosk '{}' is not registered", kiosk_id),
        )
        .into_response(),
    }
}

/// Resident set size of this process, in bytes. Linux only; other
/// platforms report zero.
pub fn resident_memory_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(statm) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(resident_pages) = statm
                .split_whitespace()
                .nth(1)
                .and_then(|v| v.parse::<u64>().ok())
            {
                return resident_pages * 4096;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kiosk_header_allows_plain_identifiers() {
        let mut headers = HeaderMap::new();
        headers.insert(KIOSK_HEADER, "kiosk_West-2".parse().unwrap());
        assert_eq!(kiosk_id_from_headers(&headers), "kiosk_West-2");
    }

    #[test]
    fn test_kiosk_header_with_path_characters_is_anonymous() {
        for hostile in ["../escape", "a/b", "a\\b", "..", "kiosk 1", "."] {
            let mut headers = HeaderMap::new();
            headers.insert(KIOSK_HEADER, hostile.parse().unwrap());
            assert_eq!(kiosk_id_from_headers(&headers), "unknown", "{}", hostile);
        }
    }

    #[test]
    fn test_missing_or_empty_kiosk_header_is_anonymous() {
        assert_eq!(kiosk_id_from_headers(&HeaderMap::new()), "unknown");
        let mut headers = HeaderMap::new();
        headers.insert(KIOSK_HEADER, "".parse().unwrap());
        assert_eq!(kiosk_id_from_headers(&headers), "unknown");
    }

    #[test]
    fn test_resident_memory_is_nonzero_on_linux() {
        if cfg!(target_os = "linux") {
            assert!(resident_memory_bytes() > 0);
        } else {
            assert_eq!(resident_memory_bytes(), 0);
        }
    }
}
