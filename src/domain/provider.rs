//! Provider identity.
//!
//! [`ProviderCode`] is the closed set of booking sites the engine knows
//! how to extract from. It is used as the circuit-breaker key, the
//! session-pool key, and the first component of every fingerprint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported holiday-park booking providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCode {
    /// centerparcs.nl
    CenterParcs,
    /// landal.nl
    Landal,
    /// roompot.nl
    Roompot,
    /// europarcs.nl
    EuroParcs,
    /// molecaten.nl
    Molecaten,
    /// ardoer.com
    Ardoer,
}

impl ProviderCode {
    /// All providers the engine can schedule jobs for.
    pub const ALL: [Self; 6] = [
        Self::CenterParcs,
        Self::Landal,
        Self::Roompot,
        Self::EuroParcs,
        Self::Molecaten,
        Self::Ardoer,
    ];

    /// Stable lowercase slug used in fingerprints and database rows.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::CenterParcs => "centerparcs",
            Self::Landal => "landal",
            Self::Roompot => "roompot",
            Self::EuroParcs => "europarcs",
            Self::Molecaten => "molecaten",
            Self::Ardoer => "ardoer",
        }
    }
}

impl fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProviderCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "centerparcs" => Ok(Self::CenterParcs),
            "landal" => Ok(Self::Landal),
            "roompot" => Ok(Self::Roompot),
            "europarcs" => Ok(Self::EuroParcs),
            "molecaten" => Ok(Self::Molecaten),
            "ardoer" => Ok(Self::Ardoer),
            other => Err(format!("unknown provider code: {other}")),
        }
    }
}
