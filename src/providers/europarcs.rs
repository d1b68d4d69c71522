//! EuroParcs adapter.

use async_trait::async_trait;
use url::Url;

use super::common::{self, JsonShape};
use super::ProviderAdapter;
use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

const ORIGIN: &str = "https://www.europarcs.nl";

const SHAPE: JsonShape = JsonShape {
    records_path: &["data"],
    price_keys: &["price", "priceTotal", "fromPrice"],
    location_keys: &["resortName", "parkName"],
    accommodation_keys: &["accommodationName", "typeName", "name"],
    availability_keys: &["isAvailable", "status"],
    promo_keys: &["labelText", "campaign"],
    voucher_keys: &["promoCode"],
};

/// EuroParcs booking-site adapter.
#[derive(Debug)]
pub struct EuroParcs;

impl EuroParcs {
    fn search_endpoints(request: &SearchRequest) -> Vec<String> {
        let (arrival, nights) = common::arrival_and_nights(request);
        let mut endpoints = Vec::new();
        if let Ok(mut url) = Url::parse(ORIGIN) {
            url.set_path("/api/accommodations/search");
            url.query_pairs_mut()
                .append_pair("resort", &request.region)
                .append_pair("arrivalDate", &arrival.format("%Y-%m-%d").to_string())
                .append_pair("nights", &nights.to_string())
                .append_pair("adults", &request.party.adults.to_string())
                .append_pair("children", &request.party.children.to_string())
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
                url.set_path(&format!("/aanbod/{}", request.region));
                url.query_pairs_mut()
                    .append_pair("aankomst", &arrival.format("%Y-%m-%d").to_string())
                    .append_pair("nachten", &nights.to_string())
                    .append_pair("personen", &request.party.persons().to_string());
                url.into()
            },
        )
    }
}

#[async_trait]
impl ProviderAdapter for EuroParcs {
    fn code(&self) -> ProviderCode {
        ProviderCode::EuroParcs
    }

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn content_markers(&self) -> &'static [&'static str] {
        &["EuroParcs", "resorts", "vakantie"]
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
    fn rendered_page_sums_party_members() {
        let Some(start) = NaiveDate::from_ymd_opt(2026, 9, 4) else {
            panic!("valid date");
        };
        let Some(end) = NaiveDate::from_ymd_opt(2026, 9, 7) else {
            panic!("valid date");
        };
        let request = SearchRequest {
            provider: ProviderCode::EuroParcs,
            region: "bad-hoophuizen".to_string(),
            window: StayWindow::Fixed { start, end },
            party: PartyComposition {
                adults: 2,
                children: 3,
                infants: 1,
                pets: 0,
            },
            duration: DurationBounds {
                min_nights: 3,
                max_nights: 3,
            },
            budget_ceiling_minor: None,
        };
        let page = EuroParcs::results_page(&request);
        assert!(page.contains("/aanbod/bad-hoophuizen"));
        assert!(page.contains("personen=6"));
    }
}
