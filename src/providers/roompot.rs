//! Roompot adapter.

use async_trait::async_trait;
use url::Url;

use super::common::{self, JsonShape};
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.roompot.nl";

const SHAPE: JsonShape = JsonShape {
    records_path: &["searchResults", "items"],
    price_keys: &["priceFrom", "totalPrice", "price"],
    location_keys: &["parkName", "locationName"],
    accommodation_keys: &["accommodationName", "objectName", "name"],
    availability_keys: &["bookable", "available"],
    promo_keys: &["dealLabel", "promotionText"],
    voucher_keys: &["discountCode"],
};

/// Roompot booking-site adapter.
#[derive(Debug)]
pub struct Roompot;

impl Roompot {
    fn search_endpoints(request: &SearchRequest) -> Vec<String> {
        let (arrival, nights) = common::arrival_and_nights(request);
        let mut endpoints = Vec::new();
        if let Ok(mut url) = Url::parse(ORIGIN) {
            url.set_path("/api/v1/search");
            url.query_pairs_mut()
                .append_pair("location", &request.region)
                .append_pair("arrival", &arrival.format("%Y-%m-%d").to_string())
                .append_pair("nights", &nights.to_string())
                .append_pair("adults", &request.party.adults.to_string())
                .append_pair("children", &request.party.children.to_string())
                .append_pair("infants", &request.party.infants.to_string());
            endpoints.push(url.into());
        }
        endpoints
    }

    fn results_page(request: &SearchRequest) -> String {
        let (arrival, nights) = common::arrival_and_nights(request);
        Url::parse(ORIGIN).map_or_else(
            |_| ORIGIN.to_string(),
            |mut url| {
                url.set_path("/zoeken");
                url.query_pairs_mut()
                    .append_pair("bestemming", &request.region)
                    .append_pair("aankomst", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nachten", &nights.to_string())
                    .append_pair("volwassenen", &request.party.adults.to_string())
                    .append_pair("kinderen", &request.party.children.to_string());
                url.into()
            },
        )
    }
}

#[async_trait]
impl ProviderAdapter for Roompot {
    fn code(&self) -> ProviderCode {
        ProviderCode::Roompot
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["Roompot", "vakantieparken", "boek"]
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
    fn rendered_page_uses_dutch_query_names() {
        let Some(start) = NaiveDate::from_ymd_opt(2026, 7, 3) else {
            panic!("valid date");
        };
        let Some(end) = NaiveDate::from_ymd_opt(2026, 7, 10) else {
            panic!("valid date");
        };
        let request = SearchRequest {
            provider: ProviderCode::Roompot,
            region: "zeeland".to_string(),
            window: StayWindow::Fixed { start, end },
            party: PartyComposition {
                adults: 4,
                children: 0,
                infants: 0,
                pets: 0,
            },
            duration: DurationBounds {
                min_nights: 7,
                max_nights: 7,
            },
            budget_ceiling_minor: None,
        };
        let page = Roompot::results_page(&request);
        assert!(page.contains("bestemming=zeeland"));
        assert!(page.contains("aankomst=2026-07-03"));
        assert!(page.contains("nachten=7"));
    }
}
