//! Persistence layer: the repository seam plus its PostgreSQL and
//! in-memory implementations.
//!
//! The observation path is strictly append-only: [`Repository::append_observation`]
//! is the only mutating operation on the time series, and concurrent
//! appends for the same fingerprint all succeed and are all retained.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Alert, AlertStatus, FingerprintId, Insight, InsightKind, PriceObservation, SearchFingerprint,
};
use crate::error::ApiError;

/// Persistence failure, already stripped of driver detail.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.0)
    }
}

/// Storage seam for fingerprints, observations, insights, and alerts.
///
/// All implementations must keep the append path safe under concurrent
/// writers for the same or different fingerprints.
#[async_trait]
pub trait Repository: Send + Sync + std::fmt::Debug {
    /// Inserts the fingerprint if it does not exist yet. Fingerprints
    /// are never mutated after creation.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn upsert_fingerprint(&self, fingerprint: &SearchFingerprint) -> Result<(), StoreError>;

    /// Looks up a fingerprint by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn fingerprint(
        &self,
        id: &FingerprintId,
    ) -> Result<Option<SearchFingerprint>, StoreError>;

    /// Associates a profile with a fingerprint (idempotent; many
    /// profiles may share one fingerprint).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn link_profile(
        &self,
        profile_id: Uuid,
        fingerprint_id: &FingerprintId,
    ) -> Result<(), StoreError>;

    /// Fingerprints currently associated with a profile.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn fingerprints_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<SearchFingerprint>, StoreError>;

    /// Profiles currently mapped to a fingerprint (alert fan-out set).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn profiles_for_fingerprint(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Appends one observation. Never updates or deletes prior rows.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn append_observation(&self, observation: &PriceObservation) -> Result<(), StoreError>;

    /// The most recent observation for a fingerprint, by `observed_at`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn latest_observation(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Option<PriceObservation>, StoreError>;

    /// The observation series since `since`, ordered by `observed_at`
    /// ascending.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn series_since(
        &self,
        fingerprint_id: &FingerprintId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError>;

    /// Persists a new insight.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn insert_insight(&self, insight: &Insight) -> Result<(), StoreError>;

    /// Creation time of the most recent insight of `kind` for a
    /// fingerprint; the engine's cooldown check.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn last_insight_at(
        &self,
        fingerprint_id: &FingerprintId,
        kind: InsightKind,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Most recent insights across all fingerprints, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn recent_insights(&self, limit: i64) -> Result<Vec<Insight>, StoreError>;

    /// Inserts an alert unless one already exists for the same
    /// (profile, insight) pair. Returns `true` when a row was created.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn insert_alert(&self, alert: &Alert) -> Result<bool, StoreError>;

    /// Most recent alerts with their embedded insights, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn recent_alerts(
        &self,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<(Alert, Insight)>, StoreError>;

    /// Transitions an alert's status. Returns `false` when no alert
    /// with the given id exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn set_alert_status(&self, alert_id: Uuid, status: AlertStatus)
    -> Result<bool, StoreError>;
}
