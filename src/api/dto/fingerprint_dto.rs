//! Fingerprint DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{
    Currency, FingerprintId, PartyComposition, PriceObservation, ProviderCode, SearchFingerprint,
};

/// Query parameters for `GET /search/fingerprints`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct FingerprintListParams {
    /// Profile whose fingerprints to list.
    pub profile_id: Uuid,
}

/// One fingerprint with its latest price, if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct FingerprintDto {
    /// Content-addressed fingerprint id.
    pub id: FingerprintId,
    /// Provider the search targets.
    pub provider: ProviderCode,
    /// Canonical region slug.
    pub region_key: String,
    /// Canonical window bucket.
    pub window_bucket: String,
    /// Party composition.
    pub party: PartyComposition,
    /// Canonical duration bucket.
    pub duration_bucket: String,
    /// First time the fingerprint was observed.
    pub created_at: DateTime<Utc>,
    /// Most recent observed price in minor units, if any observation
    /// exists yet.
    pub latest_price_minor: Option<i64>,
    /// Currency of the latest price.
    pub latest_currency: Option<Currency>,
    /// When the latest price was observed.
    pub latest_observed_at: Option<DateTime<Utc>>,
}

impl FingerprintDto {
    /// Combines a fingerprint with its optional latest observation.
    #[must_use]
    pub fn from_parts(
        fingerprint: SearchFingerprint,
        latest: Option<&PriceObservation>,
    ) -> Self {
        Self {
            id: fingerprint.id,
            provider: fingerprint.provider,
            region_key: fingerprint.region_key,
            window_bucket: fingerprint.window_bucket,
            party: fingerprint.party,
            duration_bucket: fingerprint.duration_bucket,
            created_at: fingerprint.created_at,
            latest_price_minor: latest.map(|o| o.lowest_price_minor),
            latest_currency: latest.map(|o| o.currency),
            latest_observed_at: latest.map(|o| o.observed_at),
        }
    }
}
