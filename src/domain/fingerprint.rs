//! Deterministic search fingerprints.
//!
//! A fingerprint is the content-addressed identity of a normalized
//! search intent. Identical intent always yields the same id, across
//! process restarts and independent of extraction order — it is the
//! join key for the whole price time series.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::search::SearchRequest;
use super::{PartyComposition, ProviderCode};

/// Content-addressed fingerprint identity: 32 lowercase hex characters
/// (the first 16 bytes of a SHA-256 over the canonical key).
///
/// Collision-freedom over the finite realistic input space is the
/// requirement here, not cryptographic strength.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct FingerprintId(String);

impl FingerprintId {
    /// Derives the id from a canonical key string.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let Some(prefix) = digest.get(..16) else {
            // SHA-256 always yields 32 bytes; this arm is unreachable.
            return Self(hex::encode(digest));
        };
        Self(hex::encode(prefix))
    }

    /// Wraps an already-derived id (e.g. read back from the database).
    #[must_use]
    pub fn from_stored(id: String) -> Self {
        Self(id)
    }

    /// The hex string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fingerprint together with the canonical parts it was derived from.
///
/// Created lazily on first successful extraction and never mutated.
/// Many profiles may map to the same fingerprint, sharing its history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFingerprint {
    /// Content-addressed identity.
    pub id: FingerprintId,
    /// Provider the search targets.
    pub provider: ProviderCode,
    /// Canonical region slug.
    pub region_key: String,
    /// Canonical window bucket.
    pub window_bucket: String,
    /// Exact party composition.
    pub party: PartyComposition,
    /// Canonical duration bucket.
    pub duration_bucket: String,
    /// First time this fingerprint was observed.
    pub created_at: DateTime<Utc>,
}

impl SearchFingerprint {
    /// Derives the fingerprint for a normalized search request.
    ///
    /// Pure: two semantically identical requests (whatever their
    /// original formatting) produce byte-identical ids.
    #[must_use]
    pub fn derive(request: &SearchRequest) -> Self {
        let region_key = request.region_key();
        let window_bucket = request.window_bucket();
        let duration_bucket = request.duration_bucket();
        let key = format!(
            "{}|{}|{}|a{}|c{}|i{}|p{}|{}",
            request.provider.slug(),
            region_key,
            window_bucket,
            request.party.adults,
            request.party.children,
            request.party.infants,
            request.party.pets,
            duration_bucket,
        );
        Self {
            id: FingerprintId::from_key(&key),
            provider: request.provider,
            region_key,
            window_bucket,
            party: request.party,
            duration_bucket,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::search::{DurationBounds, StayWindow};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    fn request(region: &str) -> SearchRequest {
        SearchRequest {
            provider: ProviderCode::Roompot,
            region: region.to_string(),
            window: StayWindow::Fixed {
                start: date(2026, 7, 3),
                end: date(2026, 7, 10),
            },
            party: PartyComposition {
                adults: 2,
                children: 1,
                infants: 1,
                pets: 0,
            },
            duration: DurationBounds {
                min_nights: 7,
                max_nights: 7,
            },
            budget_ceiling_minor: Some(120_000),
        }
    }

    #[test]
    fn identical_intent_yields_identical_id() {
        let a = SearchFingerprint::derive(&request("Beach Resort Nieuwvliet"));
        let b = SearchFingerprint::derive(&request("beach-resort-nieuwvliet"));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn id_is_stable_across_calls() {
        let req = request("De Katjeskelder");
        let first = SearchFingerprint::derive(&req);
        let second = SearchFingerprint::derive(&req);
        assert_eq!(first.id, second.id);
        assert_eq!(first.id.as_str().len(), 32);
    }

    #[test]
    fn budget_ceiling_does_not_affect_identity() {
        // The ceiling filters alerts, it is not part of the search intent.
        let mut with = request("de-eemhof");
        with.budget_ceiling_minor = Some(50_000);
        let mut without = request("de-eemhof");
        without.budget_ceiling_minor = None;
        assert_eq!(
            SearchFingerprint::derive(&with).id,
            SearchFingerprint::derive(&without).id
        );
    }

    #[test]
    fn different_party_yields_different_id() {
        let base = request("de-eemhof");
        let mut larger = request("de-eemhof");
        larger.party.adults = 4;
        assert_ne!(
            SearchFingerprint::derive(&base).id,
            SearchFingerprint::derive(&larger).id
        );
    }

    #[test]
    fn different_provider_yields_different_id() {
        let roompot = request("de-eemhof");
        let mut landal = request("de-eemhof");
        landal.provider = ProviderCode::Landal;
        assert_ne!(
            SearchFingerprint::derive(&roompot).id,
            SearchFingerprint::derive(&landal).id
        );
    }
}
