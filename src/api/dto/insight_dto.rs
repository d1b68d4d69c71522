//! Insight and price-history DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{
    Currency, FingerprintId, Insight, InsightKind, PriceObservation, SourceStrategy,
};

/// Query parameters for `GET /insights/{fingerprint_id}/price-history`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PriceHistoryParams {
    /// How far back to look, in days. Defaults to 90, max 365.
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    90
}

impl PriceHistoryParams {
    /// Clamps the look-back window to 1–365 days.
    #[must_use]
    pub const fn clamped(&self) -> Self {
        Self {
            days: clamp_days(self.days),
        }
    }
}

const fn clamp_days(days: i64) -> i64 {
    if days < 1 {
        1
    } else if days > 365 {
        365
    } else {
        days
    }
}

/// Query parameters for `GET /insights/recent`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RecentInsightParams {
    /// Maximum number of insights to return. Defaults to 20, max 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_limit() -> i64 {
    20
}

impl RecentInsightParams {
    /// Clamps the limit to 1–100.
    #[must_use]
    pub const fn clamped(&self) -> Self {
        Self {
            limit: clamp_limit(self.limit),
        }
    }
}

pub(crate) const fn clamp_limit(limit: i64) -> i64 {
    if limit < 1 {
        1
    } else if limit > 100 {
        100
    } else {
        limit
    }
}

/// One point of a fingerprint's price series.
#[derive(Debug, Serialize, ToSchema)]
pub struct PricePointDto {
    /// When the price was observed.
    pub observed_at: DateTime<Utc>,
    /// Lowest valid price in minor units.
    pub price_minor: i64,
    /// Currency of the price.
    pub currency: Currency,
    /// Accommodation descriptor of the cheapest record.
    pub accommodation: String,
    /// Whether the stay was bookable.
    pub available: bool,
    /// Strategy that produced the observation.
    pub strategy: SourceStrategy,
}

impl From<PriceObservation> for PricePointDto {
    fn from(observation: PriceObservation) -> Self {
        Self {
            observed_at: observation.observed_at,
            price_minor: observation.lowest_price_minor,
            currency: observation.currency,
            accommodation: observation.accommodation,
            available: observation.available,
            strategy: observation.strategy,
        }
    }
}

/// Response body for `GET /insights/{fingerprint_id}/price-history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PriceHistoryResponse {
    /// The fingerprint the series belongs to.
    pub fingerprint_id: FingerprintId,
    /// Look-back window actually applied, in days.
    pub window_days: i64,
    /// Series points ordered by `observed_at` ascending.
    pub points: Vec<PricePointDto>,
}

/// One derived insight.
#[derive(Debug, Serialize, ToSchema)]
pub struct InsightDto {
    /// Insight identity.
    pub id: Uuid,
    /// Fingerprint whose history produced the insight.
    pub fingerprint_id: FingerprintId,
    /// Kind discriminator.
    pub kind: InsightKind,
    /// One-line human-readable summary.
    pub summary: String,
    /// Kind-specific structured payload.
    pub details: serde_json::Value,
    /// When the engine created the insight.
    pub created_at: DateTime<Utc>,
}

impl From<Insight> for InsightDto {
    fn from(insight: Insight) -> Self {
        Self {
            id: insight.id,
            fingerprint_id: insight.fingerprint_id,
            kind: insight.kind,
            summary: insight.summary,
            details: insight.details,
            created_at: insight.created_at,
        }
    }
}
