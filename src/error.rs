//! Error types: the extraction failure taxonomy and the API error enum
//! with HTTP status code mapping.
//!
//! [`ExtractionError`] classifies every way a provider extraction can go
//! wrong; no raw `reqwest`/parsing error ever leaves the pipeline
//! untranslated. [`ApiError`] is the central error type for the REST
//! surface, mapping each variant to a status code and a structured JSON
//! error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ProviderCode;

/// Classified failure of a single extraction job or strategy attempt.
///
/// The pipeline reacts differently per variant:
///
/// | Variant | Pipeline reaction |
/// |---|---|
/// | `TransientNetwork` | next strategy, then next scheduled tick |
/// | `ChallengeUnresolved` | abort job, feed circuit breaker |
/// | `StructuralMismatch` | soft failure, fall to next strategy |
/// | `RateLimited` | abort job, extended provider cooldown |
/// | `DataIntegrity` | record discarded, never stored |
/// | `ProviderUnavailable` | short-circuited by the breaker |
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    /// Navigation or request failed, or a bounded wait timed out.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The anti-bot challenge never resolved into real page content.
    #[error("challenge unresolved for {provider}: marker did not appear within {waited_ms} ms")]
    ChallengeUnresolved {
        /// Provider whose challenge could not be absorbed.
        provider: ProviderCode,
        /// How long the pool waited for a content marker.
        waited_ms: u64,
    },

    /// A strategy ran to completion but produced zero well-formed records.
    ///
    /// Logged distinctly from timeouts so operators can tell page-structure
    /// drift apart from anti-bot escalation.
    #[error("structural mismatch: {strategy} on {provider} yielded no well-formed records")]
    StructuralMismatch {
        /// Provider whose page shape no longer matches.
        provider: ProviderCode,
        /// Human-readable strategy name that came up empty.
        strategy: &'static str,
    },

    /// The provider returned an explicit throttling signal (HTTP 429 or
    /// an in-page rate-limit notice).
    #[error("rate limited by {provider}")]
    RateLimited {
        /// Provider that throttled us.
        provider: ProviderCode,
    },

    /// A record parsed but carried an implausible value (e.g. a
    /// non-positive price). The record is discarded, never stored.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// The provider is currently short-circuited by the circuit breaker
    /// or its session failed challenge absorption.
    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable {
        /// Provider that is unavailable.
        provider: ProviderCode,
        /// Short operator-facing reason.
        reason: String,
    },
}

impl ExtractionError {
    /// Short status token persisted as a profile's last-check status.
    #[must_use]
    pub const fn status_token(&self) -> &'static str {
        match self {
            Self::TransientNetwork(_) => "transient_network_error",
            Self::ChallengeUnresolved { .. } => "challenge_unresolved",
            Self::StructuralMismatch { .. } => "structural_mismatch",
            Self::RateLimited { .. } => "rate_limited",
            Self::DataIntegrity(_) => "data_integrity_error",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
        }
    }

    /// Whether this failure should count against the provider's
    /// consecutive-failure threshold.
    #[must_use]
    pub const fn trips_breaker(&self) -> bool {
        !matches!(self, Self::DataIntegrity(_))
    }
}

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "alert not found: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum for the REST surface.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No fingerprint with the given id exists.
    #[error("fingerprint not found: {0}")]
    FingerprintNotFound(String),

    /// No alert with the given id exists.
    #[error("alert not found: {0}")]
    AlertNotFound(uuid::Uuid),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::FingerprintNotFound(_) => 2001,
            Self::AlertNotFound(_) => 2002,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::FingerprintNotFound(_) | Self::AlertNotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
