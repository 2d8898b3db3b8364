//! Authoritative sources - provenance origins for terminology
//!
//! A source is a terminology database (IATE, IEC), a standards PDF,
//! or a pool of manual entries. Sources are ranked by tier:
//! - `1`: Authoritative (IATE, IEC, DIN)
//! - `2`: Translator-grade (DeepL and similar)
//! - `3`: Internal glossaries

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How terminology from a source is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Api,
    Pdf,
    Database,
    Manual,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Api => "api",
            SourceType::Pdf => "pdf",
            SourceType::Database => "database",
            SourceType::Manual => "manual",
        }
    }

    pub fn all() -> &'static [SourceType] {
        &[
            SourceType::Api,
            SourceType::Pdf,
            SourceType::Database,
            SourceType::Manual,
        ]
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(SourceType::Api),
            "pdf" => Ok(SourceType::Pdf),
            "database" | "db" => Ok(SourceType::Database),
            "manual" => Ok(SourceType::Manual),
            _ => Err(Error::invalid_enum("source_type", s)),
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance trust ranking of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Tier {
    /// Authoritative standards bodies and terminology databases
    Authoritative = 1,
    /// Professional translation services
    Translator = 2,
    /// Internal glossaries and manual entry pools
    Internal = 3,
}

impl Tier {
    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Authoritative => "authoritative",
            Tier::Translator => "translator",
            Tier::Internal => "internal",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Authoritative
    }
}

impl TryFrom<i64> for Tier {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Tier::Authoritative),
            2 => Ok(Tier::Translator),
            3 => Ok(Tier::Internal),
            other => Err(Error::invalid_enum("tier", other)),
        }
    }
}

impl From<Tier> for i64 {
    fn from(tier: Tier) -> Self {
        tier.as_i64()
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "authoritative" => Ok(Tier::Authoritative),
            "translator" => Ok(Tier::Translator),
            "internal" => Ok(Tier::Internal),
            other => other
                .parse::<i64>()
                .map_err(|_| Error::invalid_enum("tier", s))
                .and_then(Tier::try_from),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// A persisted authoritative source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeSource {
    pub id: i64,
    /// Unique identifier: 'IATE', 'IEC', 'DIN'
    pub name: String,
    pub display_name: String,
    pub source_type: SourceType,
    pub tier: Tier,
    pub is_active: bool,
    /// Opaque source-specific settings (endpoints, credentials, sync options)
    pub config: Option<serde_json::Value>,
    /// Last time this source was synced
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert request for a source.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
    pub name: String,
    pub display_name: String,
    pub source_type: SourceType,
    pub tier: Tier,
    pub is_active: bool,
    pub config: Option<serde_json::Value>,
}

impl NewSource {
    /// Create an active source with no config
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, source_type: SourceType, tier: Tier) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            source_type,
            tier,
            is_active: true,
            config: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_roundtrip() {
        for kind in SourceType::all() {
            let parsed: SourceType = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_unknown_source_type_rejected() {
        let err = "ftp".parse::<SourceType>().unwrap_err();
        assert!(matches!(err, Error::InvalidEnum { field: "source_type", .. }));
    }

    #[test]
    fn test_tier_bounds() {
        assert_eq!(Tier::try_from(1).unwrap(), Tier::Authoritative);
        assert_eq!(Tier::try_from(3).unwrap(), Tier::Internal);
        assert!(matches!(Tier::try_from(0), Err(Error::InvalidEnum { field: "tier", .. })));
        assert!(matches!(Tier::try_from(4), Err(Error::InvalidEnum { .. })));
        assert_eq!("2".parse::<Tier>().unwrap(), Tier::Translator);
        assert_eq!("internal".parse::<Tier>().unwrap(), Tier::Internal);
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_serde_as_number() {
        let json = serde_json::to_string(&Tier::Translator).unwrap();
        assert_eq!(json, "2");
        assert!(serde_json::from_str::<Tier>("5").is_err());
    }
}
