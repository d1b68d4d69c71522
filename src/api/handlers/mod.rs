//! REST endpoint handlers organized by resource.

pub mod alerts;
pub mod fingerprints;
pub mod insights;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(fingerprints::routes())
        .merge(insights::routes())
        .merge(alerts::routes())
        .merge(system::provider_routes())
}
