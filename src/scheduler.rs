//! Periodic scheduler.
//!
//! Every tick lists the profiles due for a re-check and enqueues one
//! job each, spread over a small random jitter so providers never see
//! a synchronized burst at tick boundaries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::pipeline::JobQueue;
use crate::profiles::ProfileStore;

/// Runs the scheduling loop until cancelled.
pub async fn run(
    profiles: Arc<dyn ProfileStore>,
    queue: JobQueue,
    config: &EngineConfig,
    cancel: CancellationToken,
) {
    let tick = Duration::from_secs(config.scheduler_tick_secs.max(1));
    let jitter_secs = config.scheduler_jitter_secs;
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(tick_secs = tick.as_secs(), "scheduler started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let due = match profiles.list_due(Utc::now()).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!(error = %err, "listing due profiles failed");
                continue;
            }
        };
        if due.is_empty() {
            continue;
        }
        tracing::info!(due = due.len(), "enqueueing due profiles");

        for profile in due {
            let delay = jitter(jitter_secs);
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(delay) => queue.enqueue(profile),
                }
            });
        }
    }
    tracing::info!("scheduler stopped");
}

fn jitter(max_secs: u64) -> Duration {
    if max_secs == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_secs * 1000))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        DurationBounds, PartyComposition, ProviderCode, SearchProfile, SearchRequest, StayWindow,
    };
    use crate::profiles::MemoryProfileStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn due_profile() -> SearchProfile {
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
                provider: ProviderCode::Molecaten,
                region: "park-de-leemkule".to_string(),
                window: StayWindow::Fixed { start, end },
                party: PartyComposition {
                    adults: 2,
                    children: 0,
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

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..50 {
            assert!(jitter(30) <= Duration::from_secs(30));
        }
        assert_eq!(jitter(0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn due_profiles_get_enqueued() {
        let profiles = Arc::new(MemoryProfileStore::with_profiles(vec![due_profile()]));
        let (queue, mut rx) = JobQueue::bounded(8);
        let cancel = CancellationToken::new();
        let config = EngineConfig {
            scheduler_tick_secs: 1,
            scheduler_jitter_secs: 0,
            ..EngineConfig::default()
        };

        let handle = tokio::spawn({
            let profiles = Arc::clone(&profiles) as Arc<dyn ProfileStore>;
            let cancel = cancel.clone();
            async move { run(profiles, queue, &config, cancel).await }
        });

        // Advance past the first tick; the profile must land in the queue.
        tokio::time::advance(Duration::from_secs(2)).await;
        let Some(job) = rx.recv().await else {
            panic!("expected an enqueued job");
        };
        assert_eq!(job.request.provider, ProviderCode::Molecaten);

        cancel.cancel();
        let Ok(()) = handle.await else {
            panic!("scheduler task panicked");
        };
    }
}
