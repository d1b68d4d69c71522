//! Molecaten adapter.
//!
//! Molecaten renders search results server-side with no interceptable
//! JSON endpoint, so this adapter is DOM-heuristics only.

use async_trait::async_trait;
use url::Url;

use super::common;
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.molecaten.nl";

/// Molecaten booking-site adapter.
#[derive(Debug)]
pub struct Molecaten;

impl Molecaten {
    fn results_page(request: &SearchRequest) -> String {
        let (arrival, nights) = common::arrival_and_nights(request);
        Url::parse(ORIGIN).map_or_else(
            |_| ORIGIN.to_string(),
            |mut url| {
                url.set_path(&format!("/nl/{}/verblijven", request.region));
                url.query_pairs_mut()
                    .append_pair("aankomst", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nachten", &nights.to_string())
                    .append_pair("volwassenen", &request.party.adults.to_string())
                    .append_pair("kinderen", &request.party.children.to_string())
                    .append_pair("huisdieren", &request.party.pets.to_string());
                url.into()
            },
        )
    }
}

#[async_trait]
impl ProviderAdapter for Molecaten {
    fn code(&self) -> ProviderCode {
        ProviderCode::Molecaten
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["Molecaten", "vakantieparken", "kamperen"]
    }

    fn strategies(&self) -> &'static [SourceStrategy] {
        &[SourceStrategy::RenderedPage]
    }

    async fn extract(
        &self,
        session: &ProviderSession,
        request: &SearchRequest,
        strategy: SourceStrategy,
    ) -> Result<Vec<RawRecord>, ExtractionError> {
        match strategy {
            SourceStrategy::StructuredResponse => Err(ExtractionError::StructuralMismatch {
                provider: self.code(),
                strategy: "structured_response",
            }),
            SourceStrategy::RenderedPage => {
                let page = Self::results_page(request);
                common::rendered_page(session, self.code(), &page, &common::DUTCH_CUES).await
            }
        }
    }
}
