//! Alert handlers: listing and status transitions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{AlertDto, AlertListParams};
use crate::app_state::AppState;
use crate::domain::AlertStatus;
use crate::error::{ApiError, ErrorResponse};

/// `GET /alerts/recent` — Recent alerts with embedded insights.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/alerts/recent",
    tag = "Alerts",
    summary = "Recent alerts",
    description = "Returns the most recent alerts, newest first, each with its insight embedded. With unread_only=true, read and dismissed alerts are excluded.",
    params(AlertListParams),
    responses(
        (status = 200, description = "Recent alerts", body = Vec<AlertDto>),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn recent_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params.clamped();
    let alerts: Vec<AlertDto> = state
        .repo
        .recent_alerts(params.limit, params.unread_only)
        .await?
        .into_iter()
        .map(|(alert, insight)| AlertDto::from_parts(alert, insight))
        .collect();
    Ok(Json(alerts))
}

/// `PATCH /alerts/{id}/read` — Mark an alert read.
///
/// # Errors
///
/// Returns [`ApiError::AlertNotFound`] for unknown ids.
#[utoipa::path(
    patch,
    path = "/api/v1/alerts/{id}/read",
    tag = "Alerts",
    summary = "Mark an alert read",
    params(
        ("id" = uuid::Uuid, Path, description = "Alert UUID"),
    ),
    responses(
        (status = 204, description = "Alert marked read"),
        (status = 404, description = "Alert not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    transition(&state, id, AlertStatus::Read).await
}

/// `PATCH /alerts/{id}/dismiss` — Dismiss an alert.
///
/// # Errors
///
/// Returns [`ApiError::AlertNotFound`] for unknown ids.
#[utoipa::path(
    patch,
    path = "/api/v1/alerts/{id}/dismiss",
    tag = "Alerts",
    summary = "Dismiss an alert",
    params(
        ("id" = uuid::Uuid, Path, description = "Alert UUID"),
    ),
    responses(
        (status = 204, description = "Alert dismissed"),
        (status = 404, description = "Alert not found", body = ErrorResponse),
    )
)]
pub async fn dismiss(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    transition(&state, id, AlertStatus::Dismissed).await
}

async fn transition(
    state: &AppState,
    id: Uuid,
    status: AlertStatus,
) -> Result<StatusCode, ApiError> {
    if state.repo.set_alert_status(id, status).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::AlertNotFound(id))
    }
}

/// Alert routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts/recent", get(recent_alerts))
        .route("/alerts/{id}/read", patch(mark_read))
        .route("/alerts/{id}/dismiss", patch(dismiss))
}
