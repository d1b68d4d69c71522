//! Per-provider circuit breaker.
//!
//! Consecutive job failures open a provider's circuit; while open, jobs
//! for that provider are skipped without touching the network. After
//! the cooldown one probe job is let through (half-open); its outcome
//! closes or re-opens the circuit. An explicit rate-limit signal opens
//! the circuit immediately with the extended cooldown.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::domain::ProviderCode;
use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy)]
enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

/// Operator-facing snapshot of one provider's circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    /// Provider the snapshot describes.
    pub provider: ProviderCode,
    /// `"closed"`, `"open"`, or `"half_open"`.
    pub state: &'static str,
    /// Consecutive failures recorded while closed.
    pub consecutive_failures: u32,
    /// Seconds until an open circuit admits a probe, if open.
    pub retry_in_secs: Option<u64>,
}

/// Circuit breaker over all known providers.
#[derive(Debug)]
pub struct CircuitBreaker {
    states: Mutex<HashMap<ProviderCode, BreakerState>>,
    failure_threshold: u32,
    cooldown: Duration,
    rate_limit_cooldown: Duration,
}

impl CircuitBreaker {
    /// Builds a breaker with thresholds from configuration; every
    /// provider starts closed.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let states = ProviderCode::ALL
            .into_iter()
            .map(|p| (p, BreakerState::Closed { failures: 0 }))
            .collect();
        Self {
            states: Mutex::new(states),
            failure_threshold: config.breaker_failure_threshold,
            cooldown: Duration::from_secs(config.breaker_cooldown_secs),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
        }
    }

    /// Admits or rejects a job for `provider`. An open circuit whose
    /// cooldown has elapsed transitions to half-open and admits one
    /// probe.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::ProviderUnavailable`] while the
    /// circuit is open.
    pub fn admit(&self, provider: ProviderCode) -> Result<(), ExtractionError> {
        let Ok(mut states) = self.states.lock() else {
            return Err(ExtractionError::ProviderUnavailable {
                provider,
                reason: "breaker state poisoned".to_string(),
            });
        };
        match states.get(&provider).copied() {
            Some(BreakerState::Open { until }) => {
                if Instant::now() >= until {
                    states.insert(provider, BreakerState::HalfOpen);
                    tracing::info!(%provider, "circuit half-open, admitting probe");
                    Ok(())
                } else {
                    Err(ExtractionError::ProviderUnavailable {
                        provider,
                        reason: "circuit open".to_string(),
                    })
                }
            }
            _ => Ok(()),
        }
    }

    /// Records a successful job: the circuit closes and the failure
    /// count resets.
    pub fn record_success(&self, provider: ProviderCode) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(provider, BreakerState::Closed { failures: 0 });
        }
    }

    /// Records a failed job. Counts toward the threshold when closed;
    /// re-opens immediately when half-open.
    pub fn record_failure(&self, provider: ProviderCode, error: &ExtractionError) {
        if !error.trips_breaker() {
            return;
        }
        let Ok(mut states) = self.states.lock() else {
            return;
        };
        // Rate limiting opens immediately with the extended cooldown.
        if matches!(error, ExtractionError::RateLimited { .. }) {
            tracing::warn!(%provider, cooldown_secs = self.rate_limit_cooldown.as_secs(),
                "rate limited, circuit opened with extended cooldown");
            states.insert(
                provider,
                BreakerState::Open {
                    until: Instant::now() + self.rate_limit_cooldown,
                },
            );
            return;
        }
        let next = match states.get(&provider).copied() {
            Some(BreakerState::Closed { failures }) => {
                let failures = failures.saturating_add(1);
                if failures >= self.failure_threshold {
                    tracing::warn!(%provider, failures, "failure threshold reached, circuit opened");
                    BreakerState::Open {
                        until: Instant::now() + self.cooldown,
                    }
                } else {
                    BreakerState::Closed { failures }
                }
            }
            Some(BreakerState::HalfOpen) => {
                tracing::warn!(%provider, "probe failed, circuit re-opened");
                BreakerState::Open {
                    until: Instant::now() + self.cooldown,
                }
            }
            Some(open @ BreakerState::Open { .. }) => open,
            None => BreakerState::Closed { failures: 1 },
        };
        states.insert(provider, next);
    }

    /// Snapshot of every provider's circuit for the status endpoint.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        let Ok(states) = self.states.lock() else {
            return Vec::new();
        };
        let now = Instant::now();
        let mut health: Vec<ProviderHealth> = ProviderCode::ALL
            .into_iter()
            .map(|provider| match states.get(&provider).copied() {
                Some(BreakerState::Open { until }) if until > now => ProviderHealth {
                    provider,
                    state: "open",
                    consecutive_failures: 0,
                    retry_in_secs: Some((until - now).as_secs()),
                },
                Some(BreakerState::Open { .. }) => ProviderHealth {
                    provider,
                    state: "open",
                    consecutive_failures: 0,
                    retry_in_secs: Some(0),
                },
                Some(BreakerState::HalfOpen) => ProviderHealth {
                    provider,
                    state: "half_open",
                    consecutive_failures: 0,
                    retry_in_secs: None,
                },
                Some(BreakerState::Closed { failures }) => ProviderHealth {
                    provider,
                    state: "closed",
                    consecutive_failures: failures,
                    retry_in_secs: None,
                },
                None => ProviderHealth {
                    provider,
                    state: "closed",
                    consecutive_failures: 0,
                    retry_in_secs: None,
                },
            })
            .collect();
        health.sort_by_key(|h| h.provider.slug());
        health
    }
}
