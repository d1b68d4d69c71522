//! Search-profile collaborator interface.
//!
//! Profiles are owned by the external profile-management layer; the
//! engine only lists enabled profiles that are due for a re-check and
//! stamps the outcome back. The trait exists so the scheduler can be
//! tested without Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{SearchProfile, SearchRequest};
use crate::store::StoreError;

/// Read/stamp access to externally owned search profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync + std::fmt::Debug {
    /// Enabled profiles whose `check_frequency_hours` has elapsed since
    /// their last check (or that have never been checked).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<SearchProfile>, StoreError>;

    /// Looks up a single profile by id; alert fan-out uses this to apply
    /// per-profile budget ceilings.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn get(&self, profile_id: Uuid) -> Result<Option<SearchProfile>, StoreError>;

    /// Stamps a profile's last-check timestamp and status token.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure.
    async fn mark_checked(
        &self,
        profile_id: Uuid,
        at: DateTime<Utc>,
        status: &str,
    ) -> Result<(), StoreError>;
}

/// Profile store backed by the shared Postgres database.
///
/// The search intent is stored as a JSONB `request` column; the profile
/// management UI writes it, the engine only reads it.
#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    /// Creates a new profile store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<SearchProfile>, StoreError> {
        type ProfileRow = (
            Uuid,
            bool,
            serde_json::Value,
            i64,
            Option<DateTime<Utc>>,
            Option<String>,
        );
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, enabled, request, check_frequency_hours, last_checked_at, \
             last_check_status \
             FROM search_profiles \
             WHERE enabled AND (last_checked_at IS NULL \
                OR last_checked_at <= $1 - make_interval(hours => check_frequency_hours::int))",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError(e.to_string()))?;

        rows.into_iter()
            .map(
                |(id, enabled, request, freq, last_checked_at, last_check_status)| {
                    let request: SearchRequest = serde_json::from_value(request)
                        .map_err(|e| StoreError(format!("malformed profile {id}: {e}")))?;
                    Ok(SearchProfile {
                        id,
                        enabled,
                        request,
                        check_frequency_hours: freq,
                        last_checked_at,
                        last_check_status,
                    })
                },
            )
            .collect()
    }

    async fn get(&self, profile_id: Uuid) -> Result<Option<SearchProfile>, StoreError> {
        type ProfileRow = (
            Uuid,
            bool,
            serde_json::Value,
            i64,
            Option<DateTime<Utc>>,
            Option<String>,
        );
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, enabled, request, check_frequency_hours, last_checked_at, \
             last_check_status \
             FROM search_profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError(e.to_string()))?;

        row.map(
            |(id, enabled, request, freq, last_checked_at, last_check_status)| {
                let request: SearchRequest = serde_json::from_value(request)
                    .map_err(|e| StoreError(format!("malformed profile {id}: {e}")))?;
                Ok(SearchProfile {
                    id,
                    enabled,
                    request,
                    check_frequency_hours: freq,
                    last_checked_at,
                    last_check_status,
                })
            },
        )
        .transpose()
    }

    async fn mark_checked(
        &self,
        profile_id: Uuid,
        at: DateTime<Utc>,
        status: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE search_profiles SET last_checked_at = $2, last_check_status = $3 \
             WHERE id = $1",
        )
        .bind(profile_id)
        .bind(at)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError(e.to_string()))?;
        Ok(())
    }
}

/// In-memory profile store for tests and demo runs.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<Vec<SearchProfile>>,
}

impl MemoryProfileStore {
    /// Creates a store seeded with the given profiles.
    #[must_use]
    pub fn with_profiles(profiles: Vec<SearchProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<SearchProfile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().filter(|p| p.due_at(now)).cloned().collect())
    }

    async fn get(&self, profile_id: Uuid) -> Result<Option<SearchProfile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.id == profile_id).cloned())
    }

    async fn mark_checked(
        &self,
        profile_id: Uuid,
        at: DateTime<Utc>,
        status: &str,
    ) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.iter_mut().find(|p| p.id == profile_id) {
            profile.last_checked_at = Some(at);
            profile.last_check_status = Some(status.to_string());
        }
        Ok(())
    }
}
