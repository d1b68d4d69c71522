//! Fingerprint handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{FingerprintDto, FingerprintListParams};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `GET /search/fingerprints` — Fingerprints tracked for a profile.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/search/fingerprints",
    tag = "Fingerprints",
    summary = "List a profile's fingerprints",
    description = "Returns every search fingerprint associated with the given profile, each with its most recent observed price when one exists.",
    params(FingerprintListParams),
    responses(
        (status = 200, description = "Fingerprint list", body = Vec<FingerprintDto>),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn list_fingerprints(
    State(state): State<AppState>,
    Query(params): Query<FingerprintListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let fingerprints = state
        .repo
        .fingerprints_for_profile(params.profile_id)
        .await?;

    let mut dtos = Vec::with_capacity(fingerprints.len());
    for fingerprint in fingerprints {
        let latest = state.repo.latest_observation(&fingerprint.id).await?;
        dtos.push(FingerprintDto::from_parts(fingerprint, latest.as_ref()));
    }
    Ok(Json(dtos))
}

/// Fingerprint routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/search/fingerprints", get(list_fingerprints))
}
