//! Insight derivation and alert fan-out.
//!
//! After every stored observation the [`engine`] evaluates the
//! fingerprint's history against all insight rules in a fixed order,
//! suppressing repeats with a per-kind cooldown; the [`dispatcher`]
//! then fans each created insight out to every profile mapped to the
//! fingerprint, deduplicated per (profile, insight) pair.

pub mod dispatcher;
pub mod engine;

pub use dispatcher::AlertDispatcher;
pub use engine::{InsightEngine, ObservationContext};
