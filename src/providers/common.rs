//! Shared extraction strategies.
//!
//! Two techniques cover all providers:
//!
//! 1. **Structured interception** — request the JSON search endpoints
//!    the provider's own frontend calls, and lift records out of a
//!    declared [`JsonShape`].
//! 2. **Rendered-page heuristics** — locate text nodes containing a
//!    currency symbol and a digit, walk ancestors to the nearest
//!    element that also contains an occupancy/duration cue, and treat
//!    that element as a result card.
//!
//! Both discard cards that lack an explicit price AND occupancy token.

use std::sync::LazyLock;

use chrono::NaiveDate;
use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{ProviderCode, RawRecord, SearchRequest, SourceStrategy, StayWindow};
use crate::error::ExtractionError;
use crate::session::ProviderSession;

/// Declarative description of where records live in a provider's JSON
/// search response.
#[derive(Debug, Clone, Copy)]
pub struct JsonShape {
    /// Object path from the root to the records array.
    pub records_path: &'static [&'static str],
    /// Candidate keys holding the price (number or string).
    pub price_keys: &'static [&'static str],
    /// Candidate keys holding the park/location name.
    pub location_keys: &'static [&'static str],
    /// Candidate keys holding the accommodation descriptor.
    pub accommodation_keys: &'static [&'static str],
    /// Candidate keys holding an availability flag.
    pub availability_keys: &'static [&'static str],
    /// Candidate keys holding promotional campaign text.
    pub promo_keys: &'static [&'static str],
    /// Candidate keys holding a voucher/discount code.
    pub voucher_keys: &'static [&'static str],
}

/// Phrases providers use on throttle pages.
const RATE_LIMIT_HINTS: [&str; 3] = ["too many requests", "rate limit", "te veel verzoeken"];

/// Occupancy/duration cue fallback shared by Dutch providers.
pub const DUTCH_CUES: [&str; 6] = ["pers.", "personen", "nachten", "persons", "nights", "p."];

#[allow(clippy::unwrap_used)] // compile-time constant pattern
static VOUCHER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:actiecode|kortingscode|voucher|code)[:\s]+([A-Z0-9]{4,12})\b").unwrap()
});

#[allow(clippy::unwrap_used)] // compile-time constant pattern
static PRICE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[€£]\s*[0-9]|[0-9][0-9.,]*\s*[€£]").unwrap());

/// Arrival date and stay length an adapter should query for.
///
/// Flexible windows query from the earliest start with the minimum
/// duration; the fingerprint's flex bucket keeps the series coherent.
#[must_use]
pub fn arrival_and_nights(request: &SearchRequest) -> (NaiveDate, u8) {
    match request.window {
        StayWindow::Fixed { start, end } => {
            let nights = u8::try_from((end - start).num_days().max(1)).unwrap_or(u8::MAX);
            (start, nights)
        }
        StayWindow::Flexible { earliest_start, .. } => {
            (earliest_start, request.duration.min_nights.max(1))
        }
    }
}

/// Strategy 1: fetch the provider's JSON search endpoints and lift
/// records out of the declared shape.
///
/// # Errors
///
/// [`ExtractionError::RateLimited`] propagates immediately;
/// [`ExtractionError::StructuralMismatch`] when responses arrived but
/// no well-formed record could be lifted;
/// [`ExtractionError::TransientNetwork`] when no endpoint answered.
pub async fn intercept_structured(
    session: &ProviderSession,
    provider: ProviderCode,
    endpoints: &[String],
    shape: &JsonShape,
) -> Result<Vec<RawRecord>, ExtractionError> {
    let mut any_response = false;
    for endpoint in endpoints {
        match session.fetch_json(endpoint).await {
            Ok(payload) => {
                any_response = true;
                let records = records_from_json(&payload, shape);
                if !records.is_empty() {
                    return Ok(records);
                }
                tracing::debug!(%provider, endpoint, "structured response had no usable records");
            }
            Err(err @ ExtractionError::RateLimited { .. }) => return Err(err),
            Err(err) => {
                tracing::debug!(%provider, endpoint, error = %err, "endpoint fetch failed");
            }
        }
    }
    if any_response {
        Err(ExtractionError::StructuralMismatch {
            provider,
            strategy: "structured_response",
        })
    } else {
        Err(ExtractionError::TransientNetwork(format!(
            "no structured endpoint answered for {provider}"
        )))
    }
}

/// Strategy 2: fetch the rendered results page and harvest result cards
/// heuristically.
///
/// # Errors
///
/// [`ExtractionError::RateLimited`] when the page is a throttle notice;
/// [`ExtractionError::StructuralMismatch`] when no card with both a
/// price and an occupancy cue was found.
pub async fn rendered_page(
    session: &ProviderSession,
    provider: ProviderCode,
    page_url: &str,
    cues: &[&str],
) -> Result<Vec<RawRecord>, ExtractionError> {
    let html = session.fetch_text(page_url).await?;
    check_rate_limited(provider, &html)?;
    let records = harvest_cards(&html, cues);
    if records.is_empty() {
        return Err(ExtractionError::StructuralMismatch {
            provider,
            strategy: "rendered_page",
        });
    }
    Ok(records)
}

/// Detects an explicit throttle notice in page text.
///
/// # Errors
///
/// Returns [`ExtractionError::RateLimited`] when a hint phrase matches.
pub fn check_rate_limited(provider: ProviderCode, html: &str) -> Result<(), ExtractionError> {
    let lowered = html.to_lowercase();
    if RATE_LIMIT_HINTS.iter().any(|hint| lowered.contains(hint)) {
        return Err(ExtractionError::RateLimited { provider });
    }
    Ok(())
}

/// Harvests result cards from rendered HTML.
///
/// A card is the nearest ancestor of a price-bearing text node whose
/// own text also contains an occupancy/duration cue. Cards without
/// both signals are never returned.
#[must_use]
pub fn harvest_cards(html: &str, cues: &[&str]) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();
    let mut seen_cards = Vec::new();

    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !PRICE_HINT_RE.is_match(text) {
            continue;
        }
        let Some(card) = nearest_card(node, cues) else {
            continue;
        };
        let card_id = card.id();
        if seen_cards.contains(&card_id) {
            continue;
        }
        seen_cards.push(card_id);

        let card_text = collapse_whitespace(&card.text().collect::<String>());
        let price_text = text.trim().to_string();
        let lowered = card_text.to_lowercase();

        records.push(RawRecord {
            price_text,
            location_text: find_location(card).unwrap_or_else(|| first_line(&card_text)),
            accommodation_text: find_title(card).unwrap_or_else(|| first_line(&card_text)),
            available: !["uitverkocht", "volgeboekt", "sold out", "niet beschikbaar"]
                .iter()
                .any(|phrase| lowered.contains(phrase)),
            promo_banner: find_promo(card, &lowered),
            voucher_code: VOUCHER_RE
                .captures(&card_text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            strategy: SourceStrategy::RenderedPage,
        });
    }
    records
}

/// Walks ancestors of a price text node to the nearest element that
/// also carries an occupancy cue. Stops at structural roots so a cue in
/// the page footer never turns `<body>` into a card, and stops at
/// elements holding several price nodes: those are shared results
/// containers, and any cue inside them belongs to a sibling card.
fn nearest_card<'a>(
    node: NodeRef<'a, scraper::Node>,
    cues: &[&str],
) -> Option<ElementRef<'a>> {
    for ancestor in node.ancestors() {
        let Some(element) = ElementRef::wrap(ancestor) else {
            continue;
        };
        let name = element.value().name();
        if matches!(name, "body" | "html" | "main") {
            return None;
        }
        if element.text().filter(|t| PRICE_HINT_RE.is_match(t)).count() > 1 {
            return None;
        }
        let text = element.text().collect::<String>().to_lowercase();
        if cues.iter().any(|cue| text.contains(&cue.to_lowercase())) {
            return Some(element);
        }
    }
    None
}

fn select_first_text(card: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(found) = card.select(&selector).next() {
            let text = collapse_whitespace(&found.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn find_title(card: ElementRef<'_>) -> Option<String> {
    select_first_text(card, &["h1", "h2", "h3", "h4", "[class*=title]", "strong", "a"])
}

fn find_location(card: ElementRef<'_>) -> Option<String> {
    select_first_text(card, &["[class*=location]", "[class*=park]", "[class*=resort]"])
}

fn find_promo(card: ElementRef<'_>, lowered_card_text: &str) -> Option<String> {
    if let Some(text) = select_first_text(
        card,
        &["[class*=promo]", "[class*=banner]", "[class*=label]", "[class*=deal]"],
    ) {
        return Some(text);
    }
    ["korting", "actie", "aanbieding", "last minute", "deal"]
        .iter()
        .find(|phrase| lowered_card_text.contains(*phrase))
        .map(|phrase| (*phrase).to_string())
}

/// Lifts records from a JSON payload according to the declared shape.
#[must_use]
pub fn records_from_json(payload: &serde_json::Value, shape: &JsonShape) -> Vec<RawRecord> {
    let mut cursor = payload;
    for key in shape.records_path {
        match cursor.get(key) {
            Some(next) => cursor = next,
            None => return Vec::new(),
        }
    }
    let Some(items) = cursor.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| record_from_item(item, shape))
        .collect()
}

fn record_from_item(item: &serde_json::Value, shape: &JsonShape) -> Option<RawRecord> {
    let price_value = first_present(item, shape.price_keys)?;
    let price_text = price_text_from(price_value)?;

    Some(RawRecord {
        price_text,
        location_text: first_string(item, shape.location_keys).unwrap_or_default(),
        accommodation_text: first_string(item, shape.accommodation_keys).unwrap_or_default(),
        available: first_present(item, shape.availability_keys)
            .map_or(true, availability_from),
        promo_banner: first_string(item, shape.promo_keys),
        voucher_code: first_string(item, shape.voucher_keys),
        strategy: SourceStrategy::StructuredResponse,
    })
}

fn first_present<'a>(
    item: &'a serde_json::Value,
    keys: &[&str],
) -> Option<&'a serde_json::Value> {
    keys.iter().find_map(|key| {
        let found = item.get(key)?;
        if found.is_null() { None } else { Some(found) }
    })
}

fn first_string(item: &serde_json::Value, keys: &[&str]) -> Option<String> {
    first_present(item, keys)
        .and_then(serde_json::Value::as_str)
        .map(|s| collapse_whitespace(s))
        .filter(|s| !s.is_empty())
}

/// Turns a JSON price value into raw price text the normalizer accepts.
fn price_text_from(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => {
            let amount = n.as_f64()?;
            Some(format!("€ {amount:.2}"))
        }
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.contains('€') || trimmed.contains('£') {
                Some(trimmed.to_string())
            } else {
                Some(format!("€ {trimmed}"))
            }
        }
        _ => None,
    }
}

fn availability_from(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => {
            let lowered = s.to_lowercase();
            !["unavailable", "soldout", "sold_out", "uitverkocht"]
                .iter()
                .any(|phrase| lowered.contains(phrase))
        }
        serde_json::Value::Number(n) => n.as_i64().is_none_or(|v| v > 0),
        _ => true,
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_line(card_text: &str) -> String {
    card_text
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html><body>
        <main>
          <div class="results">
            <article class="result-card">
              <h3 class="card-title">Comfort cottage 4p</h3>
              <span class="card-location">De Eemhof</span>
              <p>4 personen · 4 nachten</p>
              <span class="price">€ 499,-</span>
            </article>
            <article class="result-card">
              <h3 class="card-title">Premium lodge 6p</h3>
              <span class="card-location">Het Vennenbos</span>
              <p>6 personen · 7 nachten</p>
              <div class="promo-label">Last minute korting</div>
              <span class="price">€ 1.234,56</span>
              <p>Gebruik actiecode: ZOMER25</p>
            </article>
            <article class="result-card">
              <h3>Teaser without occupancy</h3>
              <span class="price">€ 99,-</span>
            </article>
          </div>
          <footer>Vanaf € 10,- per dag parkeren</footer>
        </main>
        </body></html>
    "#;

    #[test]
    fn harvest_finds_cards_with_price_and_occupancy() {
        let records = harvest_cards(SAMPLE_HTML, &DUTCH_CUES);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn harvest_discards_cards_without_occupancy_token() {
        let records = harvest_cards(SAMPLE_HTML, &DUTCH_CUES);
        assert!(
            records
                .iter()
                .all(|r| !r.accommodation_text.contains("Teaser"))
        );
    }

    #[test]
    fn harvest_extracts_titles_locations_and_promos() {
        let records = harvest_cards(SAMPLE_HTML, &DUTCH_CUES);
        let Some(lodge) = records
            .iter()
            .find(|r| r.accommodation_text.contains("Premium lodge"))
        else {
            panic!("lodge card missing");
        };
        assert_eq!(lodge.location_text, "Het Vennenbos");
        assert_eq!(lodge.promo_banner.as_deref(), Some("Last minute korting"));
        assert_eq!(lodge.voucher_code.as_deref(), Some("ZOMER25"));
        assert_eq!(lodge.price_text.trim(), "€ 1.234,56");
    }

    #[test]
    fn container_cues_do_not_validate_price_only_cards() {
        // The shared grid holds cue-less price tiles next to one full
        // card; only the card with its own occupancy cue may harvest.
        let html = r#"
            <html><body>
            <div class="grid">
              <div class="tile"><span>€ 129,-</span></div>
              <div class="tile"><span>€ 159,-</span></div>
              <div class="tile">
                <h3>Bungalow 5p</h3>
                <p>5 personen · 3 nachten</p>
                <span>€ 389,-</span>
              </div>
            </div>
            </body></html>
        "#;
        let records = harvest_cards(html, &DUTCH_CUES);
        assert_eq!(records.len(), 1);
        let Some(only) = records.first() else {
            panic!("missing record");
        };
        assert_eq!(only.price_text.trim(), "€ 389,-");
        assert!(only.accommodation_text.contains("Bungalow"));
    }

    #[test]
    fn rate_limit_notice_is_detected() {
        let result = check_rate_limited(
            ProviderCode::Roompot,
            "<html><body>Too Many Requests</body></html>",
        );
        assert!(matches!(result, Err(ExtractionError::RateLimited { .. })));
    }

    #[test]
    fn records_lift_from_declared_json_shape() {
        let shape = JsonShape {
            records_path: &["data", "results"],
            price_keys: &["fromPrice", "price"],
            location_keys: &["parkName"],
            accommodation_keys: &["accommodationName"],
            availability_keys: &["available"],
            promo_keys: &["campaign"],
            voucher_keys: &["voucherCode"],
        };
        let payload = serde_json::json!({
            "data": { "results": [
                {
                    "fromPrice": 489.5,
                    "parkName": "Kustpark Texel",
                    "accommodationName": "Beach house 4p",
                    "available": true
                },
                {
                    "price": "€ 799,-",
                    "parkName": "De Katjeskelder",
                    "accommodationName": "Kabouterhuis 6p",
                    "available": false,
                    "campaign": "Vroegboekkorting"
                },
                { "parkName": "No price park" }
            ]}
        });
        let records = records_from_json(&payload, &shape);
        assert_eq!(records.len(), 2);

        let Some(first) = records.first() else {
            panic!("missing record");
        };
        assert_eq!(first.price_text, "€ 489.50");
        assert!(first.available);

        let Some(second) = records.get(1) else {
            panic!("missing record");
        };
        assert!(!second.available);
        assert_eq!(second.promo_banner.as_deref(), Some("Vroegboekkorting"));
    }

    #[test]
    fn arrival_and_nights_for_flexible_window() {
        let Some(earliest) = NaiveDate::from_ymd_opt(2026, 10, 12) else {
            panic!("valid date");
        };
        let Some(latest) = NaiveDate::from_ymd_opt(2026, 10, 19) else {
            panic!("valid date");
        };
        let request = SearchRequest {
            provider: ProviderCode::Landal,
            region: "de-eemhof".to_string(),
            window: StayWindow::Flexible {
                earliest_start: earliest,
                latest_start: latest,
            },
            party: crate::domain::PartyComposition {
                adults: 2,
                children: 2,
                infants: 0,
                pets: 0,
            },
            duration: crate::domain::DurationBounds {
                min_nights: 4,
                max_nights: 7,
            },
            budget_ceiling_minor: None,
        };
        assert_eq!(arrival_and_nights(&request), (earliest, 4));
    }
}
