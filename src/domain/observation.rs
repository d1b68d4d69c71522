//! Raw extraction records and persisted price observations.
//!
//! Adapters return [`RawRecord`]s: raw price/location text plus
//! provenance. Normalization to minor currency units happens here, on
//! the way into a [`PriceObservation`], never inside an adapter.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FingerprintId;
use crate::error::ExtractionError;

/// Which extraction strategy produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    /// Intercepted structured (JSON) search response.
    StructuredResponse,
    /// Heuristic extraction from the rendered results page.
    RenderedPage,
}

impl SourceStrategy {
    /// Stable name used in logs and database rows.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StructuredResponse => "structured_response",
            Self::RenderedPage => "rendered_page",
        }
    }
}

impl fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Currency of an extracted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// The currency's symbol as it appears in page text.
    #[must_use]
    pub const fn symbol(&self) -> char {
        match self {
            Self::Eur => '€',
            Self::Gbp => '£',
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

/// A parsed price in minor units (cents/pence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAmount {
    /// Amount in minor units.
    pub minor_units: i64,
    /// Currency the amount is denominated in.
    pub currency: Currency,
}

/// One result card as an adapter extracted it, before normalization.
///
/// Adapters validate defensively: a card without both an explicit price
/// and an occupancy token never becomes a `RawRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Price exactly as it appeared (`"€ 499,-"`, `"£1,234.56"`, …).
    pub price_text: String,
    /// Park/location text from the card.
    pub location_text: String,
    /// Accommodation descriptor (cottage type, lodge name, …).
    pub accommodation_text: String,
    /// Whether the card showed the stay as bookable.
    pub available: bool,
    /// Promotional banner text, when the adapter spotted one.
    pub promo_banner: Option<String>,
    /// Voucher/discount code string, when one was visible.
    pub voucher_code: Option<String>,
    /// Strategy that produced this record.
    pub strategy: SourceStrategy,
}

impl RawRecord {
    /// Parses and plausibility-checks the record's price.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::DataIntegrity`] when the price text
    /// does not parse or yields an implausible value; such records are
    /// discarded, never stored.
    pub fn validated_price(&self) -> Result<PriceAmount, ExtractionError> {
        let amount = parse_price_text(&self.price_text).ok_or_else(|| {
            ExtractionError::DataIntegrity(format!("unparseable price text: {:?}", self.price_text))
        })?;
        if amount.minor_units <= 0 {
            return Err(ExtractionError::DataIntegrity(format!(
                "non-positive price: {:?}",
                self.price_text
            )));
        }
        // A holiday stay above 50 000 major units is parser drift, not a rate.
        if amount.minor_units > 50_000 * 100 {
            return Err(ExtractionError::DataIntegrity(format!(
                "implausibly high price: {:?}",
                self.price_text
            )));
        }
        Ok(amount)
    }
}

/// One successful extraction for a fingerprint: append-only, immutable,
/// ordered by `observed_at` for all trend analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Row identity of the write (observations are never deduplicated
    /// by value, only by this identity).
    pub id: Uuid,
    /// Fingerprint the observation belongs to.
    pub fingerprint_id: FingerprintId,
    /// Stamped at extraction completion, not arrival order.
    pub observed_at: DateTime<Utc>,
    /// Lowest valid price found, in minor units.
    pub lowest_price_minor: i64,
    /// Currency of the price.
    pub currency: Currency,
    /// Accommodation/park descriptor of the cheapest record.
    pub accommodation: String,
    /// Whether the cheapest record was bookable.
    pub available: bool,
    /// Strategy that produced the cheapest record.
    pub strategy: SourceStrategy,
}

// The pattern is a compile-time constant; construction cannot fail.
#[allow(clippy::unwrap_used)]
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([€£])\s*([0-9][0-9.,]*)|([0-9][0-9.,]*)\s*([€£])").unwrap()
});

/// Parses raw price text into minor units.
///
/// Handles Dutch (`"€ 1.234,56"`, `"499,-"` suffix) and UK
/// (`"£1,234.56"`) formatting. Returns `None` when no currency symbol
/// plus number is present.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<PriceAmount> {
    let caps = PRICE_RE.captures(text)?;
    let (symbol, number) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
        (Some(sym), Some(num), _, _) | (_, _, Some(num), Some(sym)) => {
            (sym.as_str(), num.as_str())
        }
        _ => return None,
    };
    let currency = match symbol {
        "£" => Currency::Gbp,
        _ => Currency::Eur,
    };
    let minor_units = parse_number(number)?;
    Some(PriceAmount {
        minor_units,
        currency,
    })
}

/// Parses a localized number string into minor units.
fn parse_number(raw: &str) -> Option<i64> {
    // "499,-" / "499.-": whole units with an explicit empty fraction.
    let trimmed = raw
        .trim_end_matches('-')
        .trim_end_matches(',')
        .trim_end_matches('.');

    let last_comma = trimmed.rfind(',');
    let last_dot = trimmed.rfind('.');

    let (int_part, frac_part): (String, &str) = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            // The rightmost separator is the decimal one.
            let split = c.max(d);
            let (head, tail) = trimmed.split_at(split);
            (strip_separators(head), tail.get(1..).unwrap_or(""))
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let tail = trimmed.get(pos + 1..).unwrap_or("");
            if tail.len() == 2 {
                // Exactly two trailing digits: decimal separator.
                let head = trimmed.get(..pos).unwrap_or("");
                (strip_separators(head), tail)
            } else {
                // Thousands separator(s).
                (strip_separators(trimmed), "")
            }
        }
        (None, None) => (trimmed.to_string(), ""),
    };

    let whole: i64 = int_part.parse().ok()?;
    let cents: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().ok()?
    };
    Some(whole.checked_mul(100)?.checked_add(cents)?)
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(text: &str) -> PriceAmount {
        let Some(amount) = parse_price_text(text) else {
            panic!("expected {text:?} to parse");
        };
        amount
    }

    #[test]
    fn parses_dutch_whole_euros() {
        let amount = parse("€ 499,-");
        assert_eq!(amount.minor_units, 49_900);
        assert_eq!(amount.currency, Currency::Eur);
    }

    #[test]
    fn parses_dutch_thousands_with_decimal_comma() {
        let amount = parse("€ 1.234,56");
        assert_eq!(amount.minor_units, 123_456);
    }

    #[test]
    fn parses_uk_format() {
        let amount = parse("£1,234.56");
        assert_eq!(amount.minor_units, 123_456);
        assert_eq!(amount.currency, Currency::Gbp);
    }

    #[test]
    fn parses_plain_pounds() {
        let amount = parse("from £500 per stay");
        assert_eq!(amount.minor_units, 50_000);
    }

    #[test]
    fn parses_symbol_after_number() {
        let amount = parse("499,00 €");
        assert_eq!(amount.minor_units, 49_900);
    }

    #[test]
    fn rejects_text_without_currency() {
        assert!(parse_price_text("4 persons, 7 nights").is_none());
    }

    fn record(price_text: &str) -> RawRecord {
        RawRecord {
            price_text: price_text.to_string(),
            location_text: "De Eemhof".to_string(),
            accommodation_text: "Comfort cottage 4p".to_string(),
            available: true,
            promo_banner: None,
            voucher_code: None,
            strategy: SourceStrategy::RenderedPage,
        }
    }

    #[test]
    fn validated_price_accepts_plausible_values() {
        let price = record("€ 480,-").validated_price();
        assert!(price.is_ok());
    }

    #[test]
    fn validated_price_rejects_zero() {
        let result = record("€ 0,-").validated_price();
        assert!(matches!(result, Err(ExtractionError::DataIntegrity(_))));
    }

    #[test]
    fn validated_price_rejects_implausible_values() {
        let result = record("€ 9.999.999,-").validated_price();
        assert!(matches!(result, Err(ExtractionError::DataIntegrity(_))));
    }

    #[test]
    fn validated_price_rejects_missing_price() {
        let result = record("price on request").validated_price();
        assert!(matches!(result, Err(ExtractionError::DataIntegrity(_))));
    }
}
