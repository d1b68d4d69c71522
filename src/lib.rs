//! # parkwatch
//!
//! Provider extraction and price-insight engine for holiday-park
//! booking sites. The engine periodically re-checks user search
//! profiles against the providers' public booking frontends, normalizes
//! what it finds into append-only price time series keyed by
//! deterministic search fingerprints, derives typed insights (new
//! lows, sharp drops, rising trends, campaigns, vouchers), and fans
//! them out as per-profile alerts.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (due profiles, jitter)
//!     │
//!     ├── Job queue (bounded) ── Workers (pipeline/)
//!     │       │
//!     │       ├── CircuitBreaker (per provider)
//!     │       ├── SessionPool (session/) ── challenge absorption
//!     │       └── ProviderAdapters (providers/) ── strategy fallback
//!     │
//!     ├── Fingerprints + observations (store/, append-only)
//!     ├── InsightEngine ── AlertDispatcher (insight/)
//!     │
//!     └── REST API (api/) ── PostgreSQL persistence
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod insight;
pub mod pipeline;
pub mod profiles;
pub mod providers;
pub mod scheduler;
pub mod session;
pub mod store;
