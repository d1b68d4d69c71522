//! Derived price insights.
//!
//! An [`Insight`] is a typed signal computed from a fingerprint's
//! observation history. Insights are immutable once created; the
//! per-kind cooldown in the insight engine is the single source of
//! truth preventing duplicates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FingerprintId;

/// The kinds of insight the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// New price is the minimum of the last X days.
    LowestInXDays,
    /// Relative drop versus the immediately preceding observation
    /// exceeded the threshold.
    PriceDropPercent,
    /// Short moving average is rising beyond the threshold; cautionary,
    /// not a deal signal.
    RiskRising,
    /// Adapter spotted a promotional banner/campaign.
    NewCampaignDetected,
    /// Adapter spotted a voucher/discount code.
    VoucherSpotted,
}

impl InsightKind {
    /// All kinds, in the engine's fixed evaluation order.
    pub const EVALUATION_ORDER: [Self; 5] = [
        Self::LowestInXDays,
        Self::PriceDropPercent,
        Self::RiskRising,
        Self::NewCampaignDetected,
        Self::VoucherSpotted,
    ];

    /// Stable discriminator used in database rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LowestInXDays => "lowest_in_x_days",
            Self::PriceDropPercent => "price_drop_percent",
            Self::RiskRising => "risk_rising",
            Self::NewCampaignDetected => "new_campaign_detected",
            Self::VoucherSpotted => "voucher_spotted",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lowest_in_x_days" => Ok(Self::LowestInXDays),
            "price_drop_percent" => Ok(Self::PriceDropPercent),
            "risk_rising" => Ok(Self::RiskRising),
            "new_campaign_detected" => Ok(Self::NewCampaignDetected),
            "voucher_spotted" => Ok(Self::VoucherSpotted),
            other => Err(format!("unknown insight kind: {other}")),
        }
    }
}

/// A derived, typed signal over a fingerprint's price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Insight identity.
    pub id: Uuid,
    /// Fingerprint whose history produced the signal.
    pub fingerprint_id: FingerprintId,
    /// What kind of signal this is.
    pub kind: InsightKind,
    /// Human-readable one-line summary.
    pub summary: String,
    /// Structured payload (`previous_price_minor`, `current_price_minor`,
    /// `window_days`, …) depending on the kind.
    pub details: serde_json::Value,
    /// When the engine created the insight.
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Builds a new insight stamped with `Utc::now()`.
    #[must_use]
    pub fn new(
        fingerprint_id: FingerprintId,
        kind: InsightKind,
        summary: String,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fingerprint_id,
            kind,
            summary,
            details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_from_str() {
        for kind in InsightKind::EVALUATION_ORDER {
            assert_eq!(InsightKind::from_str(kind.as_str()), Ok(kind));
        }
    }

    #[test]
    fn evaluation_order_puts_lowest_first() {
        assert_eq!(
            InsightKind::EVALUATION_ORDER.first(),
            Some(&InsightKind::LowestInXDays)
        );
    }

    #[test]
    fn serde_matches_as_str() {
        for kind in InsightKind::EVALUATION_ORDER {
            let json = serde_json::to_string(&kind).ok();
            assert_eq!(json, Some(format!("\"{}\"", kind.as_str())));
        }
    }
}
