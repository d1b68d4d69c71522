//! Center Parcs adapter.
//!
//! The booking frontend drives a JSON availability API, so structured
//! interception is the primary strategy; the rendered results page
//! stays as the fallback.

use async_trait::async_trait;
use url::Url;

use super::common::{self, JsonShape};
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.centerparcs.nl";

const SHAPE: JsonShape = JsonShape {
    records_path: &["results"],
    price_keys: &["fromPrice", "price", "totalPrice"],
    location_keys: &["parkName", "resortName"],
    accommodation_keys: &["cottageTypeName", "accommodationName", "name"],
    availability_keys: &["available", "availability"],
    promo_keys: &["promotionLabel", "campaignName"],
    voucher_keys: &["voucherCode"],
};

/// Center Parcs booking-site adapter.
#[derive(Debug)]
pub struct CenterParcs;

impl CenterParcs {
    fn search_endpoints(request: &SearchRequest) -> Vec<String> {
        let (arrival, nights) = common::arrival_and_nights(request);
        let mut endpoints = Vec::new();
        if let Ok(mut url) = Url::parse(ORIGIN) {
            url.set_path("/api/search/availability");
            url.query_pairs_mut()
                .append_pair("region", &request.region)
                .append_pair("arrivalDate", &arrival.format("%Y-%m-%d").to_string())
                .append_pair("duration", &nights.to_string())
                .append_pair("adults", &request.party.adults.to_string())
                .append_pair("children", &request.party.children.to_string())
                .append_pair("babies", &request.party.infants.to_string())
                .append_pair("pets", &request.party.pets.to_string());
            endpoints.push(url.into());
        }
        endpoints
    }

    fn results_page(request: &SearchRequest) -> String {
        let (arrival, nights) = common::arrival_and_nights(request);
        Url::parse(ORIGIN).map_or_else(
            |_| ORIGIN.to_string(),
            |mut url| {
                url.set_path("/nl-nl/zoeken");
                url.query_pairs_mut()
                    .append_pair("region", &request.region)
                    .append_pair("arrival", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nights", &nights.to_string())
                    .append_pair(
                        "party",
                        &format!(
                            "{}a{}c{}b",
                            request.party.adults, request.party.children, request.party.infants
                        ),
                    );
                url.into()
            },
        )
    }
}

#[async_trait]
impl ProviderAdapter for CenterParcs {
    fn code(&self) -> ProviderCode {
        ProviderCode::CenterParcs
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["Center Parcs", "cottage", "parken"]
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

    fn request() -> SearchRequest {
        let Some(start) = NaiveDate::from_ymd_opt(2026, 10, 12) else {
            panic!("valid date");
        };
        let Some(end) = NaiveDate::from_ymd_opt(2026, 10, 16) else {
            panic!("valid date");
        };
        SearchRequest {
            provider: ProviderCode::CenterParcs,
            region: "de-eemhof".to_string(),
            window: StayWindow::Fixed { start, end },
            party: PartyComposition {
                adults: 2,
                children: 2,
                infants: 0,
                pets: 1,
            },
            duration: DurationBounds {
                min_nights: 4,
                max_nights: 4,
            },
            budget_ceiling_minor: None,
        }
    }

    #[test]
    fn structured_endpoint_encodes_party_and_window() {
        let endpoints = CenterParcs::search_endpoints(&request());
        let Some(endpoint) = endpoints.first() else {
            panic!("missing endpoint");
        };
        assert!(endpoint.starts_with("https://www.centerparcs.nl/api/search/availability?"));
        assert!(endpoint.contains("arrivalDate=2026-10-12"));
        assert!(endpoint.contains("duration=4"));
        assert!(endpoint.contains("adults=2"));
        assert!(endpoint.contains("pets=1"));
    }

    #[test]
    fn results_page_is_rooted_at_origin() {
        let page = CenterParcs::results_page(&request());
        assert!(page.starts_with("https://www.centerparcs.nl/nl-nl/zoeken?"));
        assert!(page.contains("nights=4"));
    }
}
