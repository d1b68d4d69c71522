//! System endpoints: health check and provider circuit status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::ProviderCode;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// One provider's circuit state for operators.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderStatusDto {
    /// Provider the status describes.
    pub provider: ProviderCode,
    /// `"closed"`, `"open"`, or `"half_open"`.
    pub circuit: &'static str,
    /// Consecutive failures recorded while closed.
    pub consecutive_failures: u32,
    /// Seconds until an open circuit admits a probe.
    pub retry_in_secs: Option<u64>,
}

/// `GET /providers/status` — Circuit state per provider.
#[utoipa::path(
    get,
    path = "/api/v1/providers/status",
    tag = "System",
    summary = "Provider circuit status",
    description = "Returns the circuit breaker state for every known provider: whether jobs are admitted, current failure counts, and the probe delay for open circuits.",
    responses(
        (status = 200, description = "Per-provider circuit status", body = Vec<ProviderStatusDto>),
    )
)]
pub async fn provider_status(State(state): State<AppState>) -> impl IntoResponse {
    let statuses: Vec<ProviderStatusDto> = state
        .breaker
        .snapshot()
        .into_iter()
        .map(|health| ProviderStatusDto {
            provider: health.provider,
            circuit: health.state,
            consecutive_failures: health.consecutive_failures,
            retry_in_secs: health.retry_in_secs,
        })
        .collect();
    (StatusCode::OK, Json(statuses))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// Provider status routes, mounted under /api/v1.
pub fn provider_routes() -> Router<AppState> {
    Router::new().route("/providers/status", get(provider_status))
}
