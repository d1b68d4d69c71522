//! Insight and price-history handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    InsightDto, PriceHistoryParams, PriceHistoryResponse, PricePointDto, RecentInsightParams,
};
use crate::app_state::AppState;
use crate::domain::FingerprintId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /insights/{fingerprint_id}/price-history` — A fingerprint's
/// observed price series.
///
/// # Errors
///
/// Returns [`ApiError::FingerprintNotFound`] for unknown ids.
#[utoipa::path(
    get,
    path = "/api/v1/insights/{fingerprint_id}/price-history",
    tag = "Insights",
    summary = "Price history for a fingerprint",
    description = "Returns the append-only observation series for one fingerprint, ordered by observation time ascending, within the requested look-back window.",
    params(
        ("fingerprint_id" = String, Path, description = "Fingerprint id (32 hex chars)"),
        PriceHistoryParams,
    ),
    responses(
        (status = 200, description = "Price series", body = PriceHistoryResponse),
        (status = 404, description = "Unknown fingerprint", body = ErrorResponse),
    )
)]
pub async fn price_history(
    State(state): State<AppState>,
    Path(fingerprint_id): Path<String>,
    Query(params): Query<PriceHistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params.clamped();
    let id = FingerprintId::from_stored(fingerprint_id);
    if state.repo.fingerprint(&id).await?.is_none() {
        return Err(ApiError::FingerprintNotFound(id.as_str().to_string()));
    }

    let since = Utc::now() - chrono::Duration::days(params.days);
    let points: Vec<PricePointDto> = state
        .repo
        .series_since(&id, since)
        .await?
        .into_iter()
        .map(PricePointDto::from)
        .collect();

    Ok(Json(PriceHistoryResponse {
        fingerprint_id: id,
        window_days: params.days,
        points,
    }))
}

/// `GET /insights/recent` — Most recent insights across all fingerprints.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/insights/recent",
    tag = "Insights",
    summary = "Recent insights",
    description = "Returns the most recently created insights across all fingerprints, newest first.",
    params(RecentInsightParams),
    responses(
        (status = 200, description = "Recent insights", body = Vec<InsightDto>),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn recent_insights(
    State(state): State<AppState>,
    Query(params): Query<RecentInsightParams>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params.clamped();
    let insights: Vec<InsightDto> = state
        .repo
        .recent_insights(params.limit)
        .await?
        .into_iter()
        .map(InsightDto::from)
        .collect();
    Ok(Json(insights))
}

/// Insight routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/insights/recent", get(recent_insights))
        .route(
            "/insights/{fingerprint_id}/price-history",
            get(price_history),
        )
}
