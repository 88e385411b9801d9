use super::state::ApiState;
use crate::domain::constants::{APP_VERSION, SYSTEM_TAG};
use axum::extract::State;
use axum::http::header;
use axum::{Json, response::IntoResponse};
use fauna_derive::{api_handler, api_model};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::warn;

#[api_model]
/// Health check response
struct HealthResponse {
    /// `up`, or `degraded` when the database does not answer
    status: &'static str,
    /// Version
    version: &'static str,
    /// Uptime in seconds
    uptime: u64,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_handler(
    get,
    path = "/health",
    responses((status = OK, description = "Healthcheck endpoint", body = HealthResponse)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let status = match state.database.ping().await {
        Ok(()) => "up",
        Err(err) => {
            warn!(error = %err, "Health probe failed");
            "degraded"
        }
    };

    let body = HealthResponse { status, version: APP_VERSION, uptime: START_TIME.elapsed().as_secs() };

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}

#[api_handler(
    get,
    path = "/api/ping",
    responses((status = OK, description = "Liveness probe", body = String, content_type = "text/plain")),
    tag = SYSTEM_TAG,
)]
pub(super) async fn ping_handler() -> &'static str {
    "pong"
}
