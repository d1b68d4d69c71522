//! Ardoer adapter.
//!
//! Ardoer is a federation of independent campings behind one portal;
//! results are server-rendered per camping, so the adapter is
//! DOM-heuristics only.

use async_trait::async_trait;
use url::Url;

use super::common;
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.ardoer.com";

/// Occupancy cues including the English copy some Ardoer campings use.
const CUES: [&str; 7] = [
    "pers.",
    "personen",
    "nachten",
    "persons",
    "nights",
    "p.",
    "plaatsen",
];

/// Ardoer camping-portal adapter.
#[derive(Debug)]
pub struct Ardoer;

impl Ardoer {
    fn results_page(request: &SearchRequest) -> String {
        let (arrival, nights) = common::arrival_and_nights(request);
        Url::parse(ORIGIN).map_or_else(
            |_| ORIGIN.to_string(),
            |mut url| {
                url.set_path(&format!("/nl/camping/{}/boeken", request.region));
                url.query_pairs_mut()
                    .append_pair("arrival", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nights", &nights.to_string())
                    .append_pair("adults", &request.party.adults.to_string())
                    .append_pair("children", &request.party.children.to_string());
                url.into()
            },
        )
    }
}

#[async_trait]
impl ProviderAdapter for Ardoer {
    fn code(&self) -> ProviderCode {
        ProviderCode::Ardoer
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["Ardoer", "camping", "boeken"]
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
                common::rendered_page(session, self.code(), &page, &CUES).await
            }
        }
    }
}
