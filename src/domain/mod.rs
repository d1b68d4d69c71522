//! Domain layer: provider identity, normalized search requests,
//! fingerprints, price observations, insights, and alerts.

pub mod alert;
pub mod fingerprint;
pub mod insight;
pub mod observation;
pub mod provider;
pub mod search;

pub use alert::{Alert, AlertStatus};
pub use fingerprint::{FingerprintId, SearchFingerprint};
pub use insight::{Insight, InsightKind};
pub use observation::{Currency, PriceAmount, PriceObservation, RawRecord, SourceStrategy};
pub use provider::ProviderCode;
pub use search::{DurationBounds, PartyComposition, SearchProfile, SearchRequest, StayWindow};
