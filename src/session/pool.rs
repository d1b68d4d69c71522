//! Bounded per-provider session pool with scoped acquisition.
//!
//! Pool size is capped per provider so the engine never looks like a
//! burst of parallel visitors to one site; acquisition blocking on the
//! semaphore is the intended backpressure. A [`ScopedSession`] returns
//! its session to the idle list on drop — on every exit path, including
//! extraction failure — unless the session's challenge failed, in which
//! case it is discarded.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{BrowserIdentity, ProviderSession};
use crate::config::EngineConfig;
use crate::domain::ProviderCode;
use crate::error::ExtractionError;

#[derive(Debug)]
struct ProviderSlot {
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<ProviderSession>>,
}

/// Pool of reusable browsing sessions, capped per provider.
#[derive(Debug)]
pub struct SessionPool {
    slots: HashMap<ProviderCode, Arc<ProviderSlot>>,
    cookie_ttl: Duration,
    challenge_timeout: Duration,
    request_timeout: Duration,
}

impl SessionPool {
    /// Builds a pool with one capped slot per known provider.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let slots = ProviderCode::ALL
            .into_iter()
            .map(|provider| {
                (
                    provider,
                    Arc::new(ProviderSlot {
                        semaphore: Arc::new(Semaphore::new(config.sessions_per_provider)),
                        idle: Mutex::new(Vec::new()),
                    }),
                )
            })
            .collect();
        Self {
            slots,
            cookie_ttl: Duration::from_secs(config.session_cookie_ttl_secs),
            challenge_timeout: Duration::from_millis(config.challenge_timeout_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Acquires a usable session for `provider`, blocking until a slot
    /// frees up.
    ///
    /// If the chosen session has no recent successful navigation to the
    /// provider's origin (or its cookies are stale), the pool absorbs
    /// the provider's challenge first: navigate to `origin` and wait —
    /// bounded — for one of `markers` to appear in real page content.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::ProviderUnavailable`] when the marker
    /// never appears (the session is discarded, not pooled), and
    /// [`ExtractionError::RateLimited`] when the origin throttles us
    /// during warm-up.
    pub async fn acquire(
        &self,
        provider: ProviderCode,
        origin: &str,
        markers: &[&str],
    ) -> Result<ScopedSession, ExtractionError> {
        let slot = self
            .slots
            .get(&provider)
            .cloned()
            .ok_or_else(|| ExtractionError::ProviderUnavailable {
                provider,
                reason: "no session slot configured".to_string(),
            })?;

        let permit = Arc::clone(&slot.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ExtractionError::ProviderUnavailable {
                provider,
                reason: "session pool closed".to_string(),
            })?;

        let mut session = self
            .pop_idle(&slot)
            .map_or_else(
                || ProviderSession::new(provider, BrowserIdentity::random(), self.request_timeout),
                Ok,
            )?;

        if !session.is_warm(self.cookie_ttl) {
            tracing::debug!(%provider, "session cold, absorbing challenge");
            match session
                .absorb_challenge(origin, markers, self.challenge_timeout)
                .await
            {
                Ok(()) => {}
                Err(ExtractionError::RateLimited { provider }) => {
                    // Session dropped here, not pooled.
                    return Err(ExtractionError::RateLimited { provider });
                }
                Err(err) => {
                    tracing::warn!(%provider, error = %err, "challenge absorption failed");
                    return Err(ExtractionError::ProviderUnavailable {
                        provider,
                        reason: err.status_token().to_string(),
                    });
                }
            }
        }

        Ok(ScopedSession {
            session: Some(session),
            slot,
            _permit: permit,
        })
    }

    fn pop_idle(&self, slot: &ProviderSlot) -> Option<ProviderSession> {
        slot.idle.lock().ok().and_then(|mut idle| idle.pop())
    }

    /// Number of idle (pooled) sessions for a provider. Test hook and
    /// operator metric.
    #[must_use]
    pub fn idle_count(&self, provider: ProviderCode) -> usize {
        self.slots
            .get(&provider)
            .and_then(|slot| slot.idle.lock().ok().map(|idle| idle.len()))
            .unwrap_or(0)
    }

    /// Seeds an already-warm session into the idle list. Test hook.
    #[cfg(test)]
    pub(crate) fn push_idle(&self, session: ProviderSession) {
        if let Some(slot) = self.slots.get(&session.provider())
            && let Ok(mut idle) = slot.idle.lock()
        {
            idle.push(session);
        }
    }
}

/// A session checked out from the pool; releases on drop.
#[derive(Debug)]
pub struct ScopedSession {
    session: Option<ProviderSession>,
    slot: Arc<ProviderSlot>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for ScopedSession {
    type Target = ProviderSession;

    // The session is only taken in drop, never while borrowed.
    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        self.session.as_ref().expect("session present until drop")
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if session.challenge_failed() {
                return;
            }
            if let Ok(mut idle) = self.slot.idle.lock() {
                idle.push(session);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn pool(cap: usize) -> SessionPool {
        let config = EngineConfig {
            sessions_per_provider: cap,
            ..EngineConfig::default()
        };
        SessionPool::new(&config)
    }

    fn warm_session(provider: ProviderCode) -> ProviderSession {
        let Ok(mut session) = ProviderSession::new(
            provider,
            BrowserIdentity::random(),
            Duration::from_secs(5),
        ) else {
            panic!("session build failed");
        };
        session.force_warm();
        session
    }

    #[tokio::test]
    async fn acquire_reuses_idle_warm_session() {
        let pool = pool(2);
        pool.push_idle(warm_session(ProviderCode::Roompot));
        assert_eq!(pool.idle_count(ProviderCode::Roompot), 1);

        let guard = pool
            .acquire(ProviderCode::Roompot, "https://www.roompot.nl", &["boek"])
            .await;
        let Ok(guard) = guard else {
            panic!("acquire should reuse the warm session without touching the network");
        };
        assert_eq!(pool.idle_count(ProviderCode::Roompot), 0);
        drop(guard);
        assert_eq!(pool.idle_count(ProviderCode::Roompot), 1);
    }

    #[tokio::test]
    async fn acquire_blocks_when_cap_reached() {
        let pool = pool(1);
        pool.push_idle(warm_session(ProviderCode::Landal));
        pool.push_idle(warm_session(ProviderCode::Landal));

        let first = pool
            .acquire(ProviderCode::Landal, "https://www.landal.nl", &["boek"])
            .await;
        let Ok(_first) = first else {
            panic!("first acquire should succeed");
        };

        // Cap is 1: the second acquire must park on the semaphore even
        // though another idle session exists.
        let second = tokio::time::timeout(
            Duration::from_millis(50),
            pool.acquire(ProviderCode::Landal, "https://www.landal.nl", &["boek"]),
        )
        .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn guard_returns_session_on_all_paths() {
        let pool = pool(2);
        pool.push_idle(warm_session(ProviderCode::Ardoer));

        {
            let guard = pool
                .acquire(ProviderCode::Ardoer, "https://www.ardoer.com", &["camping"])
                .await;
            let Ok(_guard) = guard else {
                panic!("acquire failed");
            };
            // Simulated extraction failure: guard dropped by scope exit.
        }
        assert_eq!(pool.idle_count(ProviderCode::Ardoer), 1);
    }
}
