//! Alert DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::insight_dto::{clamp_limit, default_limit, InsightDto};
use crate::domain::{Alert, AlertStatus, Insight};

/// Query parameters for `GET /alerts/recent`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AlertListParams {
    /// Maximum number of alerts to return. Defaults to 20, max 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// When true, only unread alerts are returned.
    #[serde(default)]
    pub unread_only: bool,
}

impl AlertListParams {
    /// Clamps the limit to 1–100.
    #[must_use]
    pub const fn clamped(&self) -> Self {
        Self {
            limit: clamp_limit(self.limit),
            unread_only: self.unread_only,
        }
    }
}

/// One alert with its embedded insight.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertDto {
    /// Alert identity.
    pub id: Uuid,
    /// Profile the alert belongs to.
    pub profile_id: Uuid,
    /// Read/dismiss lifecycle status.
    pub status: AlertStatus,
    /// When the alert was dispatched.
    pub created_at: DateTime<Utc>,
    /// The insight that produced the alert.
    pub insight: InsightDto,
}

impl AlertDto {
    /// Combines an alert row with its insight.
    #[must_use]
    pub fn from_parts(alert: Alert, insight: Insight) -> Self {
        Self {
            id: alert.id,
            profile_id: alert.profile_id,
            status: alert.status,
            created_at: alert.created_at,
            insight: insight.into(),
        }
    }
}
