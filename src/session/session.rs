//! A single automated browsing context for one provider.
//!
//! A [`ProviderSession`] wraps a `reqwest` client with a persistent
//! cookie jar and a fixed [`BrowserIdentity`]. Cookies survive across
//! calls within the session's lifetime so a solved anti-bot challenge
//! does not have to be solved again on every extraction.

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};

use super::BrowserIdentity;
use crate::domain::ProviderCode;
use crate::error::ExtractionError;

/// Interval between marker polls during challenge absorption.
const CHALLENGE_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// One reusable browsing context bound to a provider's origin.
#[derive(Debug)]
pub struct ProviderSession {
    provider: ProviderCode,
    identity: BrowserIdentity,
    client: reqwest::Client,
    last_warm: Option<Instant>,
    challenge_failed: bool,
}

impl ProviderSession {
    /// Builds a fresh session with its own cookie jar and identity.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::TransientNetwork`] if the HTTP client
    /// cannot be constructed.
    pub fn new(
        provider: ProviderCode,
        identity: BrowserIdentity,
        request_timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(lang) = HeaderValue::from_str(identity.accept_language) {
            headers.insert(header::ACCEPT_LANGUAGE, lang);
        }
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(identity.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ExtractionError::TransientNetwork(format!("client build: {e}")))?;

        Ok(Self {
            provider,
            identity,
            client,
            last_warm: None,
            challenge_failed: false,
        })
    }

    /// The provider this session is bound to.
    #[must_use]
    pub const fn provider(&self) -> ProviderCode {
        self.provider
    }

    /// The identity this session presents.
    #[must_use]
    pub const fn identity(&self) -> BrowserIdentity {
        self.identity
    }

    /// Whether the session solved a challenge within the cookie TTL.
    #[must_use]
    pub fn is_warm(&self, cookie_ttl: Duration) -> bool {
        !self.challenge_failed
            && self
                .last_warm
                .is_some_and(|at| at.elapsed() < cookie_ttl)
    }

    /// Whether the last challenge absorption failed.
    #[must_use]
    pub const fn challenge_failed(&self) -> bool {
        self.challenge_failed
    }

    /// Fetches a URL as text, translating every failure into the
    /// extraction taxonomy.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::RateLimited`] on HTTP 429,
    /// [`ExtractionError::TransientNetwork`] on any other failure.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ExtractionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::TransientNetwork(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractionError::RateLimited {
                provider: self.provider,
            });
        }
        if !response.status().is_success() {
            return Err(ExtractionError::TransientNetwork(format!(
                "GET {url}: status {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::TransientNetwork(format!("read body: {e}")))?;
        if body.is_empty() {
            return Err(ExtractionError::TransientNetwork(format!(
                "GET {url}: empty body"
            )));
        }
        Ok(body)
    }

    /// Fetches a URL as JSON, the interception path for structured
    /// search responses.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::fetch_text`]; a non-JSON body maps to
    /// [`ExtractionError::TransientNetwork`].
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ExtractionError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| ExtractionError::TransientNetwork(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractionError::RateLimited {
                provider: self.provider,
            });
        }
        if !response.status().is_success() {
            return Err(ExtractionError::TransientNetwork(format!(
                "GET {url}: status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ExtractionError::TransientNetwork(format!("parse json: {e}")))
    }

    /// Navigates to the provider's origin and waits (bounded) for a
    /// recognizable real-content marker to appear.
    ///
    /// Polls rather than sleeping a fixed amount: anti-bot interstitials
    /// usually set their clearance cookie within a couple of round
    /// trips, and the poll exits as soon as a marker shows up.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::ChallengeUnresolved`] when no marker
    /// appears before the deadline; the session is then marked failed
    /// and must not be reused.
    pub async fn absorb_challenge(
        &mut self,
        origin: &str,
        markers: &[&str],
        timeout: Duration,
    ) -> Result<(), ExtractionError> {
        let started = Instant::now();
        loop {
            match self.fetch_text(origin).await {
                Ok(body) if markers.iter().any(|m| body.contains(m)) => {
                    self.last_warm = Some(Instant::now());
                    self.challenge_failed = false;
                    return Ok(());
                }
                Ok(_) => {
                    tracing::debug!(
                        provider = %self.provider,
                        "challenge page still up, no content marker yet"
                    );
                }
                Err(ExtractionError::RateLimited { provider }) => {
                    self.challenge_failed = true;
                    return Err(ExtractionError::RateLimited { provider });
                }
                Err(err) => {
                    tracing::debug!(provider = %self.provider, error = %err, "origin fetch failed");
                }
            }
            if started.elapsed() >= timeout {
                break;
            }
            tokio::time::sleep(CHALLENGE_POLL_INTERVAL).await;
        }
        self.challenge_failed = true;
        Err(ExtractionError::ChallengeUnresolved {
            provider: self.provider,
            waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Marks the session warm without a network round trip. Test hook.
    #[cfg(test)]
    pub(crate) fn force_warm(&mut self) {
        self.last_warm = Some(Instant::now());
        self.challenge_failed = false;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn session() -> ProviderSession {
        let Ok(session) = ProviderSession::new(
            ProviderCode::Landal,
            BrowserIdentity::random(),
            Duration::from_secs(5),
        ) else {
            panic!("session build failed");
        };
        session
    }

    #[test]
    fn fresh_session_is_cold() {
        let s = session();
        assert!(!s.is_warm(Duration::from_secs(1800)));
        assert!(!s.challenge_failed());
    }

    #[test]
    fn warmed_session_expires_after_ttl() {
        let mut s = session();
        s.force_warm();
        assert!(s.is_warm(Duration::from_secs(1800)));
        assert!(!s.is_warm(Duration::from_nanos(1)));
    }
}
