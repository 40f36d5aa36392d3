//! Core types for address geocoding.

use crate::zone::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an address was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Cache,
    Nominatim,
    Builtin,
    Manual,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "Cache"),
            Self::Nominatim => write!(f, "Nominatim"),
            Self::Builtin => write!(f, "Built-in"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// A geocoded job-site address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    /// Short name (first component of the provider's display name, or the locality).
    pub name: String,
    pub coordinates: Coordinates,
    pub source: LocationSource,
    /// Full provider label, e.g. "Avenida Cabildo 2000, Belgrano, Buenos Aires, Argentina".
    #[serde(default)]
    pub display_name: Option<String>,
    /// 0.0 to 1.0
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl ResolvedAddress {
    pub fn display_line(&self) -> String {
        format!(
            "\u{1F4CD} {}\n  \u{1F4D0} {} [{}]",
            self.display_name.as_deref().unwrap_or(&self.name),
            self.coordinates,
            self.source
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("address not found: '{0}'")]
    NotFound(String),
    #[error("invalid geocoder response: {0}")]
    InvalidResponse(String),
    #[error("no address given")]
    NoInput,
}
