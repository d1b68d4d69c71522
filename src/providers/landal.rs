//! Landal GreenParks adapter.
//!
//! Landal's search page hydrates from a JSON offers endpoint; both the
//! structured path and the rendered fallback are supported.

use async_trait::async_trait;
use url::Url;

use super::common::{self, JsonShape};
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.landal.nl";

const SHAPE: JsonShape = JsonShape {
    records_path: &["data", "offers"],
    price_keys: &["priceFrom", "price", "allInPrice"],
    location_keys: &["parkName", "park"],
    accommodation_keys: &["accommodationType", "accommodationName", "title"],
    availability_keys: &["isAvailable", "available"],
    promo_keys: &["discountLabel", "promotion"],
    voucher_keys: &["actionCode", "voucherCode"],
};

/// Landal GreenParks booking-site adapter.
#[derive(Debug)]
pub struct Landal;

impl Landal {
    fn search_endpoints(request: &SearchRequest) -> Vec<String> {
        let (arrival, nights) = common::arrival_and_nights(request);
        let mut endpoints = Vec::new();
        if let Ok(mut url) = Url::parse(ORIGIN) {
            url.set_path("/api/offers/search");
            url.query_pairs_mut()
                .append_pair("park", &request.region)
                .append_pair("arrival", &arrival.format("%Y-%m-%d").to_string())
                .append_pair("nights", &nights.to_string())
                .append_pair(
                    "composition",
                    &composition_code(request),
                );
            endpoints.push(url.into());
        }
        endpoints
    }

    fn results_page(request: &SearchRequest) -> String {
        let (arrival, nights) = common::arrival_and_nights(request);
        Url::parse(ORIGIN).map_or_else(
            |_| ORIGIN.to_string(),
            |mut url| {
                url.set_path(&format!("/parken/{}", request.region));
                url.query_pairs_mut()
                    .append_pair("aankomst", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nachten", &nights.to_string())
                    .append_pair("samenstelling", &composition_code(request));
                url.into()
            },
        )
    }
}

/// Landal encodes party composition as e.g. `2a2k1b` (adults,
/// kinderen, baby's).
fn composition_code(request: &SearchRequest) -> String {
    format!(
        "{}a{}k{}b",
        request.party.adults, request.party.children, request.party.infants
    )
}

#[async_trait]
impl ProviderAdapter for Landal {
    fn code(&self) -> ProviderCode {
        ProviderCode::Landal
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["Landal", "GreenParks", "parken"]
    }

    fn strategies(&self) -> &'static [SourceStrategy] {
        &[SourceStrategy::StructuredResponse, SourceStrategy::RenderedPage]
    }

    async fn extract(
        &self,
        session: &ProviderSession,
        request: &SearchRequest,
        strategy: SourceStrategy,
    ) -> Result<Vec<RawRecord>, ExtractionError> {
        match strategy {
            SourceStrategy::StructuredResponse => {
                let endpoints = Self::search_endpoints(request);
                common::intercept_structured(session, self.code(), &endpoints, &SHAPE).await
            }
            SourceStrategy::RenderedPage => {
                let page = Self::results_page(request);
                common::rendered_page(session, self.code(), &page, &common::DUTCH_CUES).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DurationBounds, PartyComposition, StayWindow};
    use chrono::NaiveDate;

    #[test]
    fn flexible_window_queries_from_earliest_start() {
        let Some(earliest) = NaiveDate::from_ymd_opt(2027, 2, 1) else {
            panic!("valid date");
        };
        let Some(latest) = NaiveDate::from_ymd_opt(2027, 2, 14) else {
            panic!("valid date");
        };
        let request = SearchRequest {
            provider: ProviderCode::Landal,
            region: "landal-het-vennenbos".to_string(),
            window: StayWindow::Flexible {
                earliest_start: earliest,
                latest_start: latest,
            },
            party: PartyComposition {
                adults: 2,
                children: 1,
                infants: 1,
                pets: 0,
            },
            duration: DurationBounds {
                min_nights: 3,
                max_nights: 7,
            },
            budget_ceiling_minor: Some(60_000),
        };
        let endpoints = Landal::search_endpoints(&request);
        let Some(endpoint) = endpoints.first() else {
            panic!("missing endpoint");
        };
        assert!(endpoint.contains("arrival=2027-02-01"));
        assert!(endpoint.contains("nights=3"));
        assert!(endpoint.contains("composition=2a1k1b"));
    }
}
