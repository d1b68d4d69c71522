//! PostgreSQL implementation of the repository seam.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::domain::{
    Alert, AlertStatus, Currency, FingerprintId, Insight, InsightKind, PartyComposition,
    PriceObservation, ProviderCode, SearchFingerprint, SourceStrategy,
};

/// Repository backed by `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type FingerprintRow = (
    String,
    String,
    String,
    String,
    i16,
    i16,
    i16,
    i16,
    String,
    DateTime<Utc>,
);

type ObservationRow = (
    Uuid,
    String,
    DateTime<Utc>,
    i64,
    String,
    String,
    bool,
    String,
);

type InsightRow = (Uuid, String, String, String, serde_json::Value, DateTime<Utc>);

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError(err.to_string())
}

fn fingerprint_from_row(row: FingerprintRow) -> Result<SearchFingerprint, StoreError> {
    let (id, provider, region_key, window_bucket, adults, children, infants, pets, duration, at) =
        row;
    Ok(SearchFingerprint {
        id: FingerprintId::from_stored(id),
        provider: ProviderCode::from_str(&provider).map_err(StoreError)?,
        region_key,
        window_bucket,
        party: PartyComposition {
            adults: u8::try_from(adults).unwrap_or(0),
            children: u8::try_from(children).unwrap_or(0),
            infants: u8::try_from(infants).unwrap_or(0),
            pets: u8::try_from(pets).unwrap_or(0),
        },
        duration_bucket: duration,
        created_at: at,
    })
}

fn observation_from_row(row: ObservationRow) -> Result<PriceObservation, StoreError> {
    let (id, fingerprint_id, observed_at, minor, currency, accommodation, available, strategy) =
        row;
    Ok(PriceObservation {
        id,
        fingerprint_id: FingerprintId::from_stored(fingerprint_id),
        observed_at,
        lowest_price_minor: minor,
        currency: match currency.as_str() {
            "GBP" => Currency::Gbp,
            _ => Currency::Eur,
        },
        accommodation,
        available,
        strategy: match strategy.as_str() {
            "rendered_page" => SourceStrategy::RenderedPage,
            _ => SourceStrategy::StructuredResponse,
        },
    })
}

fn insight_from_row(row: InsightRow) -> Result<Insight, StoreError> {
    let (id, fingerprint_id, kind, summary, details, created_at) = row;
    Ok(Insight {
        id,
        fingerprint_id: FingerprintId::from_stored(fingerprint_id),
        kind: InsightKind::from_str(&kind).map_err(StoreError)?,
        summary,
        details,
        created_at,
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn upsert_fingerprint(&self, fingerprint: &SearchFingerprint) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO fingerprints \
             (id, provider, region_key, window_bucket, adults, children, infants, pets, \
              duration_bucket, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(fingerprint.id.as_str())
        .bind(fingerprint.provider.slug())
        .bind(&fingerprint.region_key)
        .bind(&fingerprint.window_bucket)
        .bind(i16::from(fingerprint.party.adults))
        .bind(i16::from(fingerprint.party.children))
        .bind(i16::from(fingerprint.party.infants))
        .bind(i16::from(fingerprint.party.pets))
        .bind(&fingerprint.duration_bucket)
        .bind(fingerprint.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn fingerprint(
        &self,
        id: &FingerprintId,
    ) -> Result<Option<SearchFingerprint>, StoreError> {
        let row = sqlx::query_as::<_, FingerprintRow>(
            "SELECT id, provider, region_key, window_bucket, adults, children, infants, pets, \
             duration_bucket, created_at FROM fingerprints WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(fingerprint_from_row).transpose()
    }

    async fn link_profile(
        &self,
        profile_id: Uuid,
        fingerprint_id: &FingerprintId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profile_fingerprints (profile_id, fingerprint_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(profile_id)
        .bind(fingerprint_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn fingerprints_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<SearchFingerprint>, StoreError> {
        let rows = sqlx::query_as::<_, FingerprintRow>(
            "SELECT f.id, f.provider, f.region_key, f.window_bucket, f.adults, f.children, \
             f.infants, f.pets, f.duration_bucket, f.created_at \
             FROM fingerprints f \
             JOIN profile_fingerprints pf ON pf.fingerprint_id = f.id \
             WHERE pf.profile_id = $1 ORDER BY f.created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(fingerprint_from_row).collect()
    }

    async fn profiles_for_fingerprint(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT profile_id FROM profile_fingerprints WHERE fingerprint_id = $1",
        )
        .bind(fingerprint_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows)
    }

    async fn append_observation(&self, observation: &PriceObservation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO observations \
             (id, fingerprint_id, observed_at, lowest_price_minor, currency, accommodation, \
              available, strategy) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(observation.id)
        .bind(observation.fingerprint_id.as_str())
        .bind(observation.observed_at)
        .bind(observation.lowest_price_minor)
        .bind(observation.currency.code())
        .bind(&observation.accommodation)
        .bind(observation.available)
        .bind(observation.strategy.name())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn latest_observation(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let row = sqlx::query_as::<_, ObservationRow>(
            "SELECT id, fingerprint_id, observed_at, lowest_price_minor, currency, \
             accommodation, available, strategy \
             FROM observations WHERE fingerprint_id = $1 \
             ORDER BY observed_at DESC LIMIT 1",
        )
        .bind(fingerprint_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(observation_from_row).transpose()
    }

    async fn series_since(
        &self,
        fingerprint_id: &FingerprintId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            "SELECT id, fingerprint_id, observed_at, lowest_price_minor, currency, \
             accommodation, available, strategy \
             FROM observations WHERE fingerprint_id = $1 AND observed_at >= $2 \
             ORDER BY observed_at ASC",
        )
        .bind(fingerprint_id.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(observation_from_row).collect()
    }

    async fn insert_insight(&self, insight: &Insight) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO insights (id, fingerprint_id, kind, summary, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(insight.id)
        .bind(insight.fingerprint_id.as_str())
        .bind(insight.kind.as_str())
        .bind(&insight.summary)
        .bind(&insight.details)
        .bind(insight.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn last_insight_at(
        &self,
        fingerprint_id: &FingerprintId,
        kind: InsightKind,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM insights WHERE fingerprint_id = $1 AND kind = $2 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(fingerprint_id.as_str())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(at)
    }

    async fn recent_insights(&self, limit: i64) -> Result<Vec<Insight>, StoreError> {
        let rows = sqlx::query_as::<_, InsightRow>(
            "SELECT id, fingerprint_id, kind, summary, details, created_at \
             FROM insights ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(insight_from_row).collect()
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO alerts (id, insight_id, profile_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (profile_id, insight_id) DO NOTHING",
        )
        .bind(alert.id)
        .bind(alert.insight_id)
        .bind(alert.profile_id)
        .bind(alert.status.as_str())
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn recent_alerts(
        &self,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<(Alert, Insight)>, StoreError> {
        type AlertRow = (
            Uuid,
            Uuid,
            Uuid,
            String,
            DateTime<Utc>,
            String,
            String,
            String,
            serde_json::Value,
            DateTime<Utc>,
        );
        let base = "SELECT a.id, a.insight_id, a.profile_id, a.status, a.created_at, \
             i.fingerprint_id, i.kind, i.summary, i.details, i.created_at \
             FROM alerts a JOIN insights i ON i.id = a.insight_id";
        let rows = if unread_only {
            sqlx::query_as::<_, AlertRow>(&format!(
                "{base} WHERE a.status = 'unread' ORDER BY a.created_at DESC LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, AlertRow>(&format!(
                "{base} ORDER BY a.created_at DESC LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(db_err)?;

        rows.into_iter()
            .map(
                |(id, insight_id, profile_id, status, created_at, fid, kind, summary, details, iat)| {
                    let alert = Alert {
                        id,
                        insight_id,
                        profile_id,
                        status: AlertStatus::from_str(&status).map_err(StoreError)?,
                        created_at,
                    };
                    let insight = insight_from_row((insight_id, fid, kind, summary, details, iat))?;
                    Ok((alert, insight))
                },
            )
            .collect()
    }

    async fn set_alert_status(
        &self,
        alert_id: Uuid,
        status: AlertStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE alerts SET status = $2 WHERE id = $1")
            .bind(alert_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
