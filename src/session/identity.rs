//! Realistic browsing identities.
//!
//! A session keeps one identity for its whole lifetime: a consistent
//! user-agent/viewport pair looks far less automated than rotating
//! headers between requests on the same cookie jar.

use rand::seq::SliceRandom;

/// A consistent browser identity carried by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserIdentity {
    /// User-agent header value.
    pub user_agent: &'static str,
    /// Viewport dimensions some providers echo into fingerprint cookies.
    pub viewport: (u32, u32),
    /// Accept-Language header value.
    pub accept_language: &'static str,
}

/// Fallback identity, also the first catalog entry.
const DEFAULT_IDENTITY: BrowserIdentity = BrowserIdentity {
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    viewport: (1920, 1080),
    accept_language: "nl-NL,nl;q=0.9,en-US;q=0.8,en;q=0.7",
};

/// Identity catalog: current mainstream desktop browsers.
const IDENTITIES: [BrowserIdentity; 4] = [
    DEFAULT_IDENTITY,
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        viewport: (1680, 1050),
        accept_language: "nl-NL,nl;q=0.9,en;q=0.8",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        viewport: (1920, 1080),
        accept_language: "en-GB,en;q=0.9,nl;q=0.8",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) \
                     Gecko/20100101 Firefox/121.0",
        viewport: (1536, 864),
        accept_language: "nl-NL,nl;q=0.9,en;q=0.7",
    },
];

impl BrowserIdentity {
    /// Picks a random identity from the catalog.
    #[must_use]
    pub fn random() -> Self {
        IDENTITIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DEFAULT_IDENTITY)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn random_identity_comes_from_catalog() {
        for _ in 0..20 {
            let identity = BrowserIdentity::random();
            assert!(IDENTITIES.contains(&identity));
        }
    }
}
