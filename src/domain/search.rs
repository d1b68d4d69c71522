//! Normalized search requests and the external search-profile record.
//!
//! A [`SearchRequest`] is the canonical form of a user's search intent:
//! provider, park/region selector, stay window, party composition, and
//! duration bounds. Normalization (slugs, window buckets, duration
//! buckets) lives here so the fingerprint generator stays a pure
//! combination of already-canonical parts.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProviderCode;

/// Party composition of a stay: exact head counts, no rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PartyComposition {
    /// Adults (12+).
    pub adults: u8,
    /// Children (3–11).
    pub children: u8,
    /// Infants (0–2).
    pub infants: u8,
    /// Pets travelling along.
    pub pets: u8,
}

impl PartyComposition {
    /// Total number of persons, infants included.
    #[must_use]
    pub const fn persons(&self) -> u16 {
        self.adults as u16 + self.children as u16 + self.infants as u16
    }
}

/// Desired arrival window: an exact date pair or a flexible start range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StayWindow {
    /// Exact arrival and departure dates.
    Fixed {
        /// Arrival date.
        start: NaiveDate,
        /// Departure date.
        end: NaiveDate,
    },
    /// The stay may start anywhere inside the given range.
    Flexible {
        /// Earliest acceptable arrival date.
        earliest_start: NaiveDate,
        /// Latest acceptable arrival date.
        latest_start: NaiveDate,
    },
}

/// Minimum and maximum stay length in nights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    /// Shortest acceptable stay.
    pub min_nights: u8,
    /// Longest acceptable stay.
    pub max_nights: u8,
}

/// A normalized search request handed to a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Target provider.
    pub provider: ProviderCode,
    /// Raw park/region selector as the profile stores it.
    pub region: String,
    /// Arrival window.
    pub window: StayWindow,
    /// Party composition.
    pub party: PartyComposition,
    /// Stay length bounds.
    pub duration: DurationBounds,
    /// Optional budget ceiling in minor currency units.
    pub budget_ceiling_minor: Option<i64>,
}

impl SearchRequest {
    /// Canonical lowercase slug for the park/region selector.
    ///
    /// Non-alphanumeric runs collapse to a single `-`; leading and
    /// trailing separators are trimmed. `"De Eemhof"`, `"de-eemhof"` and
    /// `" DE  EEMHOF "` all normalize to `"de-eemhof"`.
    #[must_use]
    pub fn region_key(&self) -> String {
        slugify(&self.region)
    }

    /// Canonical bucket string for the stay window.
    ///
    /// Fixed windows keep their exact ISO dates. Flexible windows bucket
    /// to the ISO week of the earliest start plus a span class, so two
    /// profiles with slightly different flex ranges in the same week
    /// share a fingerprint.
    #[must_use]
    pub fn window_bucket(&self) -> String {
        match self.window {
            StayWindow::Fixed { start, end } => format!("f:{start}_{end}"),
            StayWindow::Flexible {
                earliest_start,
                latest_start,
            } => {
                let week = earliest_start.iso_week();
                let span_days = (latest_start - earliest_start).num_days().max(0);
                format!(
                    "w:{:04}-w{:02}:s{}",
                    week.year(),
                    week.week(),
                    span_class(span_days)
                )
            }
        }
    }

    /// Canonical bucket string for the stay duration.
    #[must_use]
    pub fn duration_bucket(&self) -> String {
        if self.duration.min_nights == self.duration.max_nights {
            format!("n{}", self.duration.min_nights)
        } else {
            format!("n{}-{}", self.duration.min_nights, self.duration.max_nights)
        }
    }
}

/// An active search profile, owned by the external profile-management
/// collaborator. The engine only reads enabled profiles and stamps their
/// last-check outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Opaque profile identity.
    pub id: Uuid,
    /// Whether the profile should be scheduled at all.
    pub enabled: bool,
    /// The profile's normalized search intent.
    pub request: SearchRequest,
    /// Re-check cadence in hours.
    pub check_frequency_hours: i64,
    /// When the profile was last checked, if ever.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Status token of the last check (see `ExtractionError::status_token`).
    pub last_check_status: Option<String>,
}

impl SearchProfile {
    /// Whether the profile is due for a re-check at `now`.
    #[must_use]
    pub fn due_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_checked_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::hours(self.check_frequency_hours),
        }
    }
}

/// Buckets a flexible-start span (days) into a coarse class so nearby
/// flex ranges normalize to the same fingerprint.
const fn span_class(span_days: i64) -> i64 {
    match span_days {
        0..=3 => 3,
        4..=7 => 7,
        8..=14 => 14,
        15..=30 => 30,
        _ => 90,
    }
}

/// Lowercases and collapses non-alphanumeric runs to single dashes.
fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    fn base_request() -> SearchRequest {
        SearchRequest {
            provider: ProviderCode::Landal,
            region: "De Eemhof".to_string(),
            window: StayWindow::Fixed {
                start: date(2026, 10, 12),
                end: date(2026, 10, 16),
            },
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
    fn region_key_normalizes_formatting() {
        let mut req = base_request();
        let canonical = req.region_key();

        req.region = " DE  EEMHOF ".to_string();
        assert_eq!(req.region_key(), canonical);

        req.region = "de-eemhof".to_string();
        assert_eq!(req.region_key(), canonical);
        assert_eq!(canonical, "de-eemhof");
    }

    #[test]
    fn fixed_window_keeps_exact_dates() {
        let req = base_request();
        assert_eq!(req.window_bucket(), "f:2026-10-12_2026-10-16");
    }

    #[test]
    fn flexible_windows_in_same_week_share_bucket() {
        let mut a = base_request();
        a.window = StayWindow::Flexible {
            earliest_start: date(2026, 10, 12),
            latest_start: date(2026, 10, 14),
        };
        let mut b = base_request();
        b.window = StayWindow::Flexible {
            earliest_start: date(2026, 10, 13),
            latest_start: date(2026, 10, 16),
        };
        // Same ISO week, same span class.
        assert_eq!(a.window_bucket(), b.window_bucket());
    }

    #[test]
    fn duration_bucket_collapses_equal_bounds() {
        let mut req = base_request();
        assert_eq!(req.duration_bucket(), "n4");
        req.duration.max_nights = 7;
        assert_eq!(req.duration_bucket(), "n4-7");
    }

    #[test]
    fn profile_due_when_never_checked() {
        let profile = SearchProfile {
            id: Uuid::new_v4(),
            enabled: true,
            request: base_request(),
            check_frequency_hours: 6,
            last_checked_at: None,
            last_check_status: None,
        };
        assert!(profile.due_at(Utc::now()));
    }

    #[test]
    fn profile_not_due_within_frequency() {
        let now = Utc::now();
        let profile = SearchProfile {
            id: Uuid::new_v4(),
            enabled: true,
            request: base_request(),
            check_frequency_hours: 6,
            last_checked_at: Some(now - chrono::Duration::hours(2)),
            last_check_status: Some("ok".to_string()),
        };
        assert!(!profile.due_at(now));
        assert!(profile.due_at(now + chrono::Duration::hours(5)));
    }

    #[test]
    fn disabled_profile_never_due() {
        let profile = SearchProfile {
            id: Uuid::new_v4(),
            enabled: false,
            request: base_request(),
            check_frequency_hours: 6,
            last_checked_at: None,
            last_check_status: None,
        };
        assert!(!profile.due_at(Utc::now()));
    }
}
