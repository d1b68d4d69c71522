//! Alert fan-out.
//!
//! One insight becomes at most one alert per profile mapped to the
//! fingerprint; the (profile, insight) uniqueness lives in the store,
//! so concurrent dispatches stay idempotent. A profile's budget ceiling
//! suppresses price alerts above the ceiling — [`InsightKind::RiskRising`]
//! passes through regardless, a warning is useful precisely when the
//! price is out of reach.

use std::sync::Arc;

use crate::domain::{Alert, Insight, InsightKind, PriceObservation};
use crate::profiles::ProfileStore;
use crate::store::{Repository, StoreError};

/// Fans created insights out to interested profiles.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    repo: Arc<dyn Repository>,
    profiles: Arc<dyn ProfileStore>,
}

impl AlertDispatcher {
    /// Builds a dispatcher over the shared stores.
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { repo, profiles }
    }

    /// Creates alerts for every profile mapped to the insight's
    /// fingerprint. Returns the number of alerts actually created
    /// (deduplicated pairs count zero).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on persistence failure; alerts created
    /// before the failure stay persisted.
    pub async fn fan_out(
        &self,
        insight: &Insight,
        observation: &PriceObservation,
    ) -> Result<usize, StoreError> {
        let profile_ids = self
            .repo
            .profiles_for_fingerprint(&insight.fingerprint_id)
            .await?;

        let mut created = 0;
        for profile_id in profile_ids {
            let Some(profile) = self.profiles.get(profile_id).await? else {
                tracing::warn!(%profile_id, "profile mapped to fingerprint no longer exists");
                continue;
            };
            if !profile.enabled {
                continue;
            }
            if Self::over_budget(insight.kind, profile.request.budget_ceiling_minor, observation) {
                tracing::debug!(
                    %profile_id,
                    kind = %insight.kind,
                    "alert suppressed by budget ceiling"
                );
                continue;
            }
            let alert = Alert::new(insight.id, profile_id);
            if self.repo.insert_alert(&alert).await? {
                created += 1;
            }
        }
        if created > 0 {
            tracing::info!(
                insight_id = %insight.id,
                kind = %insight.kind,
                alerts = created,
                "alerts dispatched"
            );
        }
        Ok(created)
    }

    fn over_budget(
        kind: InsightKind,
        ceiling_minor: Option<i64>,
        observation: &PriceObservation,
    ) -> bool {
        if kind == InsightKind::RiskRising {
            return false;
        }
        ceiling_minor.is_some_and(|ceiling| observation.lowest_price_minor > ceiling)
    }
}
