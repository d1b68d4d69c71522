//! Provider adapters: one per booking site, polymorphic over a common
//! extraction capability.
//!
//! Each adapter encodes its provider's URL construction, parameter
//! encoding, and the ordered set of extraction strategies the site
//! supports. Not every provider exposes an interceptable structured
//! response — some are DOM-heuristics only. Adapters validate
//! defensively and never return best-effort guesses.

pub mod ardoer;
pub mod centerparcs;
pub mod common;
pub mod europarcs;
pub mod landal;
pub mod molecaten;
pub mod roompot;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

pub use ardoer::Ardoer;
pub use centerparcs::CenterParcs;
pub use europarcs::EuroParcs;
pub use landal::Landal;
pub use molecaten::Molecaten;
pub use roompot::Roompot;

/// Common capability every provider adapter implements.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Which provider this adapter speaks to.
    fn code(&self) -> ProviderCode;

    /// The provider's origin, navigated during challenge absorption.
    fn origin(&self) -> &'static str;

    /// Marker phrases whose appearance signals real content loaded
    /// (as opposed to an anti-bot interstitial).
    fn content_markers(&self) -> &'static [&'static str];

    /// Ordered extraction strategies, best first. The pipeline falls
    /// through this list on soft failures.
    fn strategies(&self) -> &'static [SourceStrategy];

    /// Runs one strategy against the provider for a normalized request.
    ///
    /// Returned records carry raw price/location text and provenance;
    /// normalization to canonical currency happens downstream.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractionError`] from the taxonomy; notably
    /// [`ExtractionError::StructuralMismatch`] when the strategy ran
    /// but found zero well-formed records.
    async fn extract(
        &self,
        session: &ProviderSession,
        request: &SearchRequest,
        strategy: SourceStrategy,
    ) -> Result<Vec<RawRecord>, ExtractionError>;
}

/// Builds the full adapter registry, one adapter per provider.
#[must_use]
pub fn registry() -> HashMap<ProviderCode, Arc<dyn ProviderAdapter>> {
    let adapters: [Arc<dyn ProviderAdapter>; 6] = [
        Arc::new(CenterParcs),
        Arc::new(Landal),
        Arc::new(Roompot),
        Arc::new(EuroParcs),
        Arc::new(Molecaten),
        Arc::new(Ardoer),
    ];
    adapters
        .into_iter()
        .map(|adapter| (adapter.code(), adapter))
        .collect()
}
