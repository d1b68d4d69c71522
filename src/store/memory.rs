//! In-memory repository used by tests and local runs without Postgres.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::domain::{
    Alert, AlertStatus, FingerprintId, Insight, InsightKind, PriceObservation, SearchFingerprint,
};

#[derive(Debug, Default)]
struct Inner {
    fingerprints: HashMap<FingerprintId, SearchFingerprint>,
    links: HashSet<(Uuid, FingerprintId)>,
    observations: Vec<PriceObservation>,
    insights: Vec<Insight>,
    alerts: Vec<Alert>,
}

/// Repository backed by process memory behind a single `RwLock`.
///
/// Good enough for tests and demo runs; the lock serializes writers,
/// which preserves the append-only semantics without further care.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn upsert_fingerprint(&self, fingerprint: &SearchFingerprint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .fingerprints
            .entry(fingerprint.id.clone())
            .or_insert_with(|| fingerprint.clone());
        Ok(())
    }

    async fn fingerprint(
        &self,
        id: &FingerprintId,
    ) -> Result<Option<SearchFingerprint>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.fingerprints.get(id).cloned())
    }

    async fn link_profile(
        &self,
        profile_id: Uuid,
        fingerprint_id: &FingerprintId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.links.insert((profile_id, fingerprint_id.clone()));
        Ok(())
    }

    async fn fingerprints_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<SearchFingerprint>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .iter()
            .filter(|(pid, _)| *pid == profile_id)
            .filter_map(|(_, fid)| inner.fingerprints.get(fid).cloned())
            .collect())
    }

    async fn profiles_for_fingerprint(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .iter()
            .filter(|(_, fid)| fid == fingerprint_id)
            .map(|(pid, _)| *pid)
            .collect())
    }

    async fn append_observation(&self, observation: &PriceObservation) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.observations.push(observation.clone());
        Ok(())
    }

    async fn latest_observation(
        &self,
        fingerprint_id: &FingerprintId,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .observations
            .iter()
            .filter(|o| &o.fingerprint_id == fingerprint_id)
            .max_by_key(|o| o.observed_at)
            .cloned())
    }

    async fn series_since(
        &self,
        fingerprint_id: &FingerprintId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let inner = self.inner.read().await;
        let mut series: Vec<PriceObservation> = inner
            .observations
            .iter()
            .filter(|o| &o.fingerprint_id == fingerprint_id && o.observed_at >= since)
            .cloned()
            .collect();
        series.sort_by_key(|o| o.observed_at);
        Ok(series)
    }

    async fn insert_insight(&self, insight: &Insight) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.insights.push(insight.clone());
        Ok(())
    }

    async fn last_insight_at(
        &self,
        fingerprint_id: &FingerprintId,
        kind: InsightKind,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .insights
            .iter()
            .filter(|i| &i.fingerprint_id == fingerprint_id && i.kind == kind)
            .map(|i| i.created_at)
            .max())
    }

    async fn recent_insights(&self, limit: i64) -> Result<Vec<Insight>, StoreError> {
        let inner = self.inner.read().await;
        let mut insights: Vec<Insight> = inner.insights.clone();
        insights.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        insights.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(insights)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let exists = inner
            .alerts
            .iter()
            .any(|a| a.profile_id == alert.profile_id && a.insight_id == alert.insight_id);
        if exists {
            return Ok(false);
        }
        inner.alerts.push(alert.clone());
        Ok(true)
    }

    async fn recent_alerts(
        &self,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<(Alert, Insight)>, StoreError> {
        let inner = self.inner.read().await;
        let mut alerts: Vec<Alert> = inner
            .alerts
            .iter()
            .filter(|a| !unread_only || a.status == AlertStatus::Unread)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(alerts
            .into_iter()
            .filter_map(|alert| {
                let insight = inner
                    .insights
                    .iter()
                    .find(|i| i.id == alert.insight_id)
                    .cloned()?;
                Some((alert, insight))
            })
            .collect())
    }

    async fn set_alert_status(
        &self,
        alert_id: Uuid,
        status: AlertStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Currency, SourceStrategy};

    fn fingerprint(seed: &str) -> SearchFingerprint {
        SearchFingerprint {
            id: FingerprintId::from_key(seed),
            provider: crate::domain::ProviderCode::Landal,
            region_key: "de-eemhof".to_string(),
            window_bucket: "f:2026-10-12_2026-10-16".to_string(),
            party: crate::domain::PartyComposition {
                adults: 2,
                children: 2,
                infants: 0,
                pets: 0,
            },
            duration_bucket: "n4".to_string(),
            created_at: Utc::now(),
        }
    }

    fn observation(fid: &FingerprintId, minor: i64, at: DateTime<Utc>) -> PriceObservation {
        PriceObservation {
            id: Uuid::new_v4(),
            fingerprint_id: fid.clone(),
            observed_at: at,
            lowest_price_minor: minor,
            currency: Currency::Eur,
            accommodation: "Comfort 4p".to_string(),
            available: true,
            strategy: SourceStrategy::StructuredResponse,
        }
    }

    #[tokio::test]
    async fn append_never_mutates_prior_rows() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("a");
        let Ok(()) = repo.upsert_fingerprint(&fp).await else {
            panic!("upsert failed");
        };

        let now = Utc::now();
        for (i, price) in [50_000, 48_000, 51_000].iter().enumerate() {
            let obs = observation(&fp.id, *price, now + chrono::Duration::minutes(i as i64));
            let Ok(()) = repo.append_observation(&obs).await else {
                panic!("append failed");
            };
        }

        let Ok(series) = repo.series_since(&fp.id, DateTime::<Utc>::MIN_UTC).await else {
            panic!("series failed");
        };
        assert_eq!(series.len(), 3);
        let prices: Vec<i64> = series.iter().map(|o| o.lowest_price_minor).collect();
        assert_eq!(prices, vec![50_000, 48_000, 51_000]);
    }

    #[tokio::test]
    async fn series_orders_by_observed_at_not_arrival() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("b");
        let now = Utc::now();

        // Appended out of order, as racing workers would.
        let later = observation(&fp.id, 47_000, now);
        let earlier = observation(&fp.id, 49_000, now - chrono::Duration::hours(1));
        let Ok(()) = repo.append_observation(&later).await else {
            panic!("append failed");
        };
        let Ok(()) = repo.append_observation(&earlier).await else {
            panic!("append failed");
        };

        let Ok(series) = repo.series_since(&fp.id, DateTime::<Utc>::MIN_UTC).await else {
            panic!("series failed");
        };
        let prices: Vec<i64> = series.iter().map(|o| o.lowest_price_minor).collect();
        assert_eq!(prices, vec![49_000, 47_000]);

        let Ok(Some(latest)) = repo.latest_observation(&fp.id).await else {
            panic!("latest failed");
        };
        assert_eq!(latest.lowest_price_minor, 47_000);
    }

    #[tokio::test]
    async fn identical_value_appends_are_both_retained() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("c");
        let now = Utc::now();
        let a = observation(&fp.id, 48_000, now);
        let b = observation(&fp.id, 48_000, now);
        let Ok(()) = repo.append_observation(&a).await else {
            panic!("append failed");
        };
        let Ok(()) = repo.append_observation(&b).await else {
            panic!("append failed");
        };

        let Ok(series) = repo.series_since(&fp.id, DateTime::<Utc>::MIN_UTC).await else {
            panic!("series failed");
        };
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn alert_insert_deduplicates_profile_insight_pair() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("d");
        let insight = Insight::new(
            fp.id.clone(),
            InsightKind::PriceDropPercent,
            "price dropped".to_string(),
            serde_json::json!({}),
        );
        let Ok(()) = repo.insert_insight(&insight).await else {
            panic!("insert failed");
        };

        let profile = Uuid::new_v4();
        let Ok(created) = repo.insert_alert(&Alert::new(insight.id, profile)).await else {
            panic!("insert failed");
        };
        assert!(created);
        let Ok(created_again) = repo.insert_alert(&Alert::new(insight.id, profile)).await else {
            panic!("insert failed");
        };
        assert!(!created_again);
    }

    #[tokio::test]
    async fn dismissed_alerts_excluded_from_unread_queries() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("e");
        let insight = Insight::new(
            fp.id.clone(),
            InsightKind::LowestInXDays,
            "lowest in 180 days".to_string(),
            serde_json::json!({"window_days": 180}),
        );
        let Ok(()) = repo.insert_insight(&insight).await else {
            panic!("insert failed");
        };
        let alert = Alert::new(insight.id, Uuid::new_v4());
        let Ok(_) = repo.insert_alert(&alert).await else {
            panic!("insert failed");
        };

        let Ok(unread) = repo.recent_alerts(10, true).await else {
            panic!("query failed");
        };
        assert_eq!(unread.len(), 1);

        let Ok(found) = repo.set_alert_status(alert.id, AlertStatus::Dismissed).await else {
            panic!("dismiss failed");
        };
        assert!(found);

        let Ok(unread) = repo.recent_alerts(10, true).await else {
            panic!("query failed");
        };
        assert!(unread.is_empty());

        let Ok(all) = repo.recent_alerts(10, false).await else {
            panic!("query failed");
        };
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn shared_fingerprint_links_fan_in() {
        let repo = MemoryRepository::new();
        let fp = fingerprint("f");
        let Ok(()) = repo.upsert_fingerprint(&fp).await else {
            panic!("upsert failed");
        };
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        for profile in [p1, p2, p2] {
            let Ok(()) = repo.link_profile(profile, &fp.id).await else {
                panic!("link failed");
            };
        }
        let Ok(profiles) = repo.profiles_for_fingerprint(&fp.id).await else {
            panic!("lookup failed");
        };
        assert_eq!(profiles.len(), 2);
    }
}
