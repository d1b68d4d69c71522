//! The extraction job state machine.
//!
//! One job covers a single profile check end to end: breaker admission,
//! session acquisition, the ordered strategy fallback, record
//! validation, fingerprint persistence, observation append, insight
//! evaluation, and alert fan-out. A hard wall-clock timeout bounds the
//! whole job regardless of where time is spent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::{
    PriceObservation, ProviderCode, RawRecord, SearchFingerprint, SearchProfile, SearchRequest,
};
use crate::error::ExtractionError;
use crate::insight::{AlertDispatcher, InsightEngine, ObservationContext};
use crate::pipeline::CircuitBreaker;
use crate::profiles::ProfileStore;
use crate::providers::ProviderAdapter;
use crate::session::SessionPool;
use crate::store::{Repository, StoreError};

/// Runs extraction jobs for due profiles.
#[derive(Debug)]
pub struct JobRunner {
    adapters: HashMap<ProviderCode, Arc<dyn ProviderAdapter>>,
    sessions: Arc<SessionPool>,
    breaker: Arc<CircuitBreaker>,
    repo: Arc<dyn Repository>,
    profiles: Arc<dyn ProfileStore>,
    engine: InsightEngine,
    dispatcher: AlertDispatcher,
    job_timeout: Duration,
    lowest_window_days: i64,
}

impl JobRunner {
    /// Wires a runner over the shared pipeline collaborators.
    #[must_use]
    pub fn new(
        adapters: HashMap<ProviderCode, Arc<dyn ProviderAdapter>>,
        sessions: Arc<SessionPool>,
        breaker: Arc<CircuitBreaker>,
        repo: Arc<dyn Repository>,
        profiles: Arc<dyn ProfileStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            adapters,
            sessions,
            breaker,
            engine: InsightEngine::new(Arc::clone(&repo), config),
            dispatcher: AlertDispatcher::new(Arc::clone(&repo), Arc::clone(&profiles)),
            repo,
            profiles,
            job_timeout: config.job_timeout(),
            lowest_window_days: config.lowest_window_days,
        }
    }

    /// Executes one job for `profile`. Every outcome is stamped back to
    /// the profile; failures feed the circuit breaker but never bubble
    /// out of the worker loop.
    pub async fn run(&self, profile: &SearchProfile) {
        let provider = profile.request.provider;

        if let Err(err) = self.breaker.admit(provider) {
            tracing::debug!(%provider, profile_id = %profile.id, "job skipped, circuit open");
            self.stamp(profile.id, err.status_token()).await;
            return;
        }

        let outcome = tokio::time::timeout(self.job_timeout, self.extract(&profile.request)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::TransientNetwork(format!(
                "job exceeded {}s wall clock",
                self.job_timeout.as_secs()
            ))),
        };

        match result {
            Ok(records) => match self.process(profile, records).await {
                Ok(()) => {
                    self.breaker.record_success(provider);
                    self.stamp(profile.id, "ok").await;
                }
                Err(Outcome::Extraction(err)) => {
                    tracing::warn!(%provider, profile_id = %profile.id, error = %err,
                        "records rejected");
                    self.breaker.record_failure(provider, &err);
                    self.stamp(profile.id, err.status_token()).await;
                }
                Err(Outcome::Store(err)) => {
                    tracing::error!(%provider, profile_id = %profile.id, error = %err,
                        "persistence failed");
                    self.stamp(profile.id, "store_error").await;
                }
            },
            Err(err) => {
                tracing::warn!(%provider, profile_id = %profile.id, error = %err,
                    "extraction failed");
                self.breaker.record_failure(provider, &err);
                self.stamp(profile.id, err.status_token()).await;
            }
        }
    }

    /// Acquires a session and walks the adapter's strategies in order.
    /// Soft failures (structural mismatch, transient network) fall
    /// through to the next strategy; hard failures abort the job.
    async fn extract(&self, request: &SearchRequest) -> Result<Vec<RawRecord>, ExtractionError> {
        let provider = request.provider;
        let adapter = self.adapters.get(&provider).cloned().ok_or_else(|| {
            ExtractionError::ProviderUnavailable {
                provider,
                reason: "no adapter registered".to_string(),
            }
        })?;

        let session = self
            .sessions
            .acquire(provider, adapter.origin(), adapter.content_markers())
            .await?;

        let mut last_soft: Option<ExtractionError> = None;
        for strategy in adapter.strategies() {
            match adapter.extract(&session, request, *strategy).await {
                Ok(records) if !records.is_empty() => {
                    tracing::debug!(%provider, %strategy, records = records.len(),
                        "strategy succeeded");
                    return Ok(records);
                }
                Ok(_) => {
                    last_soft = Some(ExtractionError::StructuralMismatch {
                        provider,
                        strategy: strategy.name(),
                    });
                }
                Err(
                    err @ (ExtractionError::StructuralMismatch { .. }
                    | ExtractionError::TransientNetwork(_)),
                ) => {
                    tracing::debug!(%provider, %strategy, error = %err,
                        "strategy failed, falling through");
                    last_soft = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_soft.unwrap_or(ExtractionError::StructuralMismatch {
            provider,
            strategy: "none",
        }))
    }

    /// Validates records, persists the observation, and derives insights.
    async fn process(
        &self,
        profile: &SearchProfile,
        records: Vec<RawRecord>,
    ) -> Result<(), Outcome> {
        let cheapest = cheapest_valid(&records).map_err(Outcome::Extraction)?;
        let price = cheapest.validated_price().map_err(Outcome::Extraction)?;

        let fingerprint = SearchFingerprint::derive(&profile.request);
        let fingerprint_id = fingerprint.id.clone();
        self.repo.upsert_fingerprint(&fingerprint).await?;
        self.repo.link_profile(profile.id, &fingerprint_id).await?;

        // History and the latest prior observation are read before the
        // append so the new observation never compares against itself.
        // The latest is fetched unwindowed: the drop rule compares
        // against the preceding observation however old it is.
        let since = Utc::now() - chrono::Duration::days(self.lowest_window_days);
        let history = self.repo.series_since(&fingerprint_id, since).await?;
        let previous = self.repo.latest_observation(&fingerprint_id).await?;

        let observation = PriceObservation {
            id: Uuid::new_v4(),
            fingerprint_id,
            observed_at: Utc::now(),
            lowest_price_minor: price.minor_units,
            currency: price.currency,
            accommodation: cheapest.accommodation_text.clone(),
            available: cheapest.available,
            strategy: cheapest.strategy,
        };
        self.repo.append_observation(&observation).await?;
        tracing::info!(
            fingerprint = %observation.fingerprint_id,
            price_minor = observation.lowest_price_minor,
            strategy = %observation.strategy,
            "observation stored"
        );

        let (promo, voucher) = promo_and_voucher(cheapest, &records);
        let ctx = ObservationContext {
            observation: &observation,
            history: &history,
            previous: previous.as_ref(),
            promo_banner: promo,
            voucher_code: voucher,
        };
        let insights = self.engine.evaluate(&ctx).await?;
        for insight in &insights {
            self.dispatcher.fan_out(insight, &observation).await?;
        }
        Ok(())
    }

    async fn stamp(&self, profile_id: Uuid, status: &str) {
        if let Err(err) = self.profiles.mark_checked(profile_id, Utc::now(), status).await {
            tracing::error!(%profile_id, error = %err, "failed to stamp profile check status");
        }
    }
}

/// Internal outcome split: extraction taxonomy versus persistence.
#[derive(Debug)]
enum Outcome {
    Extraction(ExtractionError),
    Store(StoreError),
}

impl From<StoreError> for Outcome {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Picks the cheapest record that passes price validation.
///
/// # Errors
///
/// Returns the last [`ExtractionError::DataIntegrity`] when no record
/// validates; the job stores nothing in that case.
fn cheapest_valid(records: &[RawRecord]) -> Result<&RawRecord, ExtractionError> {
    let mut best: Option<(&RawRecord, i64)> = None;
    let mut last_err = ExtractionError::DataIntegrity("no records".to_string());
    for record in records {
        match record.validated_price() {
            Ok(price) => {
                if best.is_none_or(|(_, minor)| price.minor_units < minor) {
                    best = Some((record, price.minor_units));
                }
            }
            Err(err) => last_err = err,
        }
    }
    best.map(|(record, _)| record).ok_or(last_err)
}

/// Promo/voucher context for the insight rules: the cheapest record's
/// own signals win, any other record's signals fill the gaps.
fn promo_and_voucher<'a>(
    cheapest: &'a RawRecord,
    records: &'a [RawRecord],
) -> (Option<&'a str>, Option<&'a str>) {
    let promo = cheapest
        .promo_banner
        .as_deref()
        .or_else(|| records.iter().find_map(|r| r.promo_banner.as_deref()));
    let voucher = cheapest
        .voucher_code
        .as_deref()
        .or_else(|| records.iter().find_map(|r| r.voucher_code.as_deref()));
    (promo, voucher)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        DurationBounds, PartyComposition, SourceStrategy, StayWindow,
    };
    use crate::profiles::MemoryProfileStore;
    use crate::session::{BrowserIdentity, ProviderSession};
    use crate::store::memory::MemoryRepository;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Adapter that never touches the network: scripted per strategy.
    #[derive(Debug)]
    struct ScriptedAdapter {
        structured: Result<Vec<RawRecord>, ExtractionError>,
        rendered: Result<Vec<RawRecord>, ExtractionError>,
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn code(&self) -> ProviderCode {
            ProviderCode::Landal
        }

        fn origin(&self) -> &'static str {
            "https://www.landal.nl"
        }

        fn content_markers(&self) -> &'static [&'static str] {
            &["Landal"]
        }

        fn strategies(&self) -> &'static [SourceStrategy] {
            &[SourceStrategy::StructuredResponse, SourceStrategy::RenderedPage]
        }

        async fn extract(
            &self,
            _session: &ProviderSession,
            _request: &SearchRequest,
            strategy: SourceStrategy,
        ) -> Result<Vec<RawRecord>, ExtractionError> {
            match strategy {
                SourceStrategy::StructuredResponse => self.structured.clone(),
                SourceStrategy::RenderedPage => self.rendered.clone(),
            }
        }
    }

    fn record(price_text: &str) -> RawRecord {
        RawRecord {
            price_text: price_text.to_string(),
            location_text: "De Eemhof".to_string(),
            accommodation_text: "Comfort cottage 4p".to_string(),
            available: true,
            promo_banner: None,
            voucher_code: None,
            strategy: SourceStrategy::StructuredResponse,
        }
    }

    fn profile() -> SearchProfile {
        let Some(start) = NaiveDate::from_ymd_opt(2026, 10, 12) else {
            panic!("valid date");
        };
        let Some(end) = NaiveDate::from_ymd_opt(2026, 10, 16) else {
            panic!("valid date");
        };
        SearchProfile {
            id: Uuid::new_v4(),
            enabled: true,
            request: SearchRequest {
                provider: ProviderCode::Landal,
                region: "de-eemhof".to_string(),
                window: StayWindow::Fixed { start, end },
                party: PartyComposition {
                    adults: 2,
                    children: 2,
                    infants: 0,
                    pets: 0,
                },
                duration: DurationBounds {
                    min_nights: 4,
                    max_nights: 4,
                },
                budget_ceiling_minor: None,
            },
            check_frequency_hours: 6,
            last_checked_at: None,
            last_check_status: None,
        }
    }

    struct Harness {
        runner: JobRunner,
        repo: Arc<MemoryRepository>,
        profiles: Arc<MemoryProfileStore>,
    }

    fn harness(adapter: ScriptedAdapter, profile: SearchProfile) -> Harness {
        let config = EngineConfig::default();
        let repo = Arc::new(MemoryRepository::default());
        let profiles = Arc::new(MemoryProfileStore::with_profiles(vec![profile]));
        let sessions = Arc::new(SessionPool::new(&config));
        // Warm session so acquisition never hits the network.
        let Ok(mut session) = ProviderSession::new(
            ProviderCode::Landal,
            BrowserIdentity::random(),
            Duration::from_secs(5),
        ) else {
            panic!("session build failed");
        };
        session.force_warm();
        sessions.push_idle(session);

        let mut adapters: HashMap<ProviderCode, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(ProviderCode::Landal, Arc::new(adapter));

        let runner = JobRunner::new(
            adapters,
            sessions,
            Arc::new(CircuitBreaker::new(&config)),
            Arc::clone(&repo) as Arc<dyn Repository>,
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            &config,
        );
        Harness {
            runner,
            repo,
            profiles,
        }
    }

    async fn status_of(profiles: &MemoryProfileStore, id: Uuid) -> Option<String> {
        let Ok(Some(profile)) = profiles.get(id).await else {
            panic!("profile missing");
        };
        profile.last_check_status
    }

    #[tokio::test]
    async fn successful_job_stores_observation_and_stamps_ok() {
        let p = profile();
        let id = p.id;
        let fingerprint_id = SearchFingerprint::derive(&p.request).id;
        let h = harness(
            ScriptedAdapter {
                structured: Ok(vec![record("€ 499,-"), record("€ 450,-")]),
                rendered: Ok(Vec::new()),
            },
            p.clone(),
        );

        h.runner.run(&p).await;

        let Ok(Some(latest)) = h.repo.latest_observation(&fingerprint_id).await else {
            panic!("observation missing");
        };
        assert_eq!(latest.lowest_price_minor, 45_000);
        assert_eq!(status_of(&h.profiles, id).await.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn structured_mismatch_falls_back_to_rendered_page() {
        let p = profile();
        let fingerprint_id = SearchFingerprint::derive(&p.request).id;
        let mut rendered = record("€ 480,-");
        rendered.strategy = SourceStrategy::RenderedPage;
        let h = harness(
            ScriptedAdapter {
                structured: Err(ExtractionError::StructuralMismatch {
                    provider: ProviderCode::Landal,
                    strategy: "structured_response",
                }),
                rendered: Ok(vec![rendered]),
            },
            p.clone(),
        );

        h.runner.run(&p).await;

        let Ok(Some(latest)) = h.repo.latest_observation(&fingerprint_id).await else {
            panic!("observation missing");
        };
        assert_eq!(latest.strategy, SourceStrategy::RenderedPage);
    }

    #[tokio::test]
    async fn rate_limit_aborts_without_trying_the_fallback() {
        let p = profile();
        let id = p.id;
        let fingerprint_id = SearchFingerprint::derive(&p.request).id;
        let h = harness(
            ScriptedAdapter {
                structured: Err(ExtractionError::RateLimited {
                    provider: ProviderCode::Landal,
                }),
                rendered: Ok(vec![record("€ 480,-")]),
            },
            p.clone(),
        );

        h.runner.run(&p).await;

        let Ok(latest) = h.repo.latest_observation(&fingerprint_id).await else {
            panic!("lookup failed");
        };
        assert!(latest.is_none());
        assert_eq!(
            status_of(&h.profiles, id).await.as_deref(),
            Some("rate_limited")
        );
    }

    #[tokio::test]
    async fn invalid_records_store_nothing() {
        let p = profile();
        let id = p.id;
        let fingerprint_id = SearchFingerprint::derive(&p.request).id;
        let h = harness(
            ScriptedAdapter {
                structured: Ok(vec![record("€ 0,-"), record("price on request")]),
                rendered: Ok(Vec::new()),
            },
            p.clone(),
        );

        h.runner.run(&p).await;

        let Ok(latest) = h.repo.latest_observation(&fingerprint_id).await else {
            panic!("lookup failed");
        };
        assert!(latest.is_none());
        assert_eq!(
            status_of(&h.profiles, id).await.as_deref(),
            Some("data_integrity_error")
        );
    }

    #[tokio::test]
    async fn price_drop_job_yields_alert_for_profile() {
        let p = profile();
        let id = p.id;
        let h = harness(
            ScriptedAdapter {
                structured: Ok(vec![record("€ 400,-")]),
                rendered: Ok(Vec::new()),
            },
            p.clone(),
        );

        // Seed prior history so the drop rule can fire.
        let fingerprint = SearchFingerprint::derive(&p.request);
        let Ok(()) = h.repo.upsert_fingerprint(&fingerprint).await else {
            panic!("upsert failed");
        };
        let Ok(()) = h
            .repo
            .append_observation(&PriceObservation {
                id: Uuid::new_v4(),
                fingerprint_id: fingerprint.id.clone(),
                observed_at: Utc::now() - chrono::Duration::hours(12),
                lowest_price_minor: 50_000,
                currency: crate::domain::Currency::Eur,
                accommodation: "Comfort cottage 4p".to_string(),
                available: true,
                strategy: SourceStrategy::StructuredResponse,
            })
            .await
        else {
            panic!("seed failed");
        };

        h.runner.run(&p).await;

        let Ok(alerts) = h.repo.recent_alerts(10, true).await else {
            panic!("alerts lookup failed");
        };
        assert!(!alerts.is_empty());
        assert!(alerts.iter().all(|(alert, _)| alert.profile_id == id));
    }

    #[tokio::test]
    async fn drop_against_stale_history_still_yields_alert() {
        let p = profile();
        let id = p.id;
        let h = harness(
            ScriptedAdapter {
                structured: Ok(vec![record("€ 400,-")]),
                rendered: Ok(Vec::new()),
            },
            p.clone(),
        );

        // The only prior observation predates the lowest-price window.
        let fingerprint = SearchFingerprint::derive(&p.request);
        let Ok(()) = h.repo.upsert_fingerprint(&fingerprint).await else {
            panic!("upsert failed");
        };
        let Ok(()) = h
            .repo
            .append_observation(&PriceObservation {
                id: Uuid::new_v4(),
                fingerprint_id: fingerprint.id.clone(),
                observed_at: Utc::now() - chrono::Duration::days(400),
                lowest_price_minor: 50_000,
                currency: crate::domain::Currency::Eur,
                accommodation: "Comfort cottage 4p".to_string(),
                available: true,
                strategy: SourceStrategy::StructuredResponse,
            })
            .await
        else {
            panic!("seed failed");
        };

        h.runner.run(&p).await;

        let Ok(alerts) = h.repo.recent_alerts(10, true).await else {
            panic!("alerts lookup failed");
        };
        assert!(
            alerts
                .iter()
                .any(|(alert, insight)| alert.profile_id == id
                    && insight.kind == crate::domain::InsightKind::PriceDropPercent)
        );
    }

    #[test]
    fn cheapest_valid_skips_broken_records() {
        let records = vec![record("€ 0,-"), record("€ 520,-"), record("€ 475,-")];
        let Ok(cheapest) = cheapest_valid(&records) else {
            panic!("expected a valid record");
        };
        assert_eq!(cheapest.price_text, "€ 475,-");
    }
}
