//! Per-profile alert records.
//!
//! An [`Alert`] is the per-user materialization of an [`super::Insight`]:
//! one row per (profile, insight) pair, mutated only by status
//! transitions, never by content change.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert read/dismiss lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Freshly dispatched, not yet seen.
    Unread,
    /// Seen by the user.
    Read,
    /// Explicitly dismissed; excluded from unread queries.
    Dismissed,
}

impl AlertStatus {
    /// Stable discriminator used in database rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(format!("unknown alert status: {other}")),
        }
    }
}

/// One alert for one profile, derived from one insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identity.
    pub id: Uuid,
    /// The insight this alert materializes.
    pub insight_id: Uuid,
    /// The profile the alert belongs to.
    pub profile_id: Uuid,
    /// Current lifecycle status.
    pub status: AlertStatus,
    /// When the dispatcher created the alert.
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Builds a fresh unread alert for a (profile, insight) pair.
    #[must_use]
    pub fn new(insight_id: Uuid, profile_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            insight_id,
            profile_id,
            status: AlertStatus::Unread,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_from_str() {
        for status in [
            AlertStatus::Unread,
            AlertStatus::Read,
            AlertStatus::Dismissed,
        ] {
            assert_eq!(AlertStatus::from_str(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn new_alert_starts_unread() {
        let alert = Alert::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(alert.status, AlertStatus::Unread);
    }
}
