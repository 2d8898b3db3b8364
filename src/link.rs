//! Term links - thesaurus relations and translations
//!
//! Two kinds of link connect terms:
//! - `SynonymLink`: undirected, one row per unordered pair, stored with the
//!   lower term id first
//! - `TranslationLink`: directed, one row per ordered (source, target) pair,
//!   endpoints in different languages
//!
//! Each link is stored once. Neighbor lookups query both columns.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Thesaurus relation between two terms.
///
/// `Broader` and `Narrower` are read from the first endpoint:
/// `(a, b, Broader)` means `a` is broader than `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Synonym,
    Broader,
    Narrower,
    Related,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Synonym => "synonym",
            RelationshipType::Broader => "broader",
            RelationshipType::Narrower => "narrower",
            RelationshipType::Related => "related",
        }
    }

    pub fn all() -> &'static [RelationshipType] {
        &[
            RelationshipType::Synonym,
            RelationshipType::Broader,
            RelationshipType::Narrower,
            RelationshipType::Related,
        ]
    }

    /// The same relation read from the other endpoint
    pub fn inverse(&self) -> RelationshipType {
        match self {
            RelationshipType::Broader => RelationshipType::Narrower,
            RelationshipType::Narrower => RelationshipType::Broader,
            RelationshipType::Synonym => RelationshipType::Synonym,
            RelationshipType::Related => RelationshipType::Related,
        }
    }
}

impl Default for RelationshipType {
    fn default() -> Self {
        RelationshipType::Synonym
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "synonym" | "syn" => Ok(RelationshipType::Synonym),
            "broader" | "bt" => Ok(RelationshipType::Broader),
            "narrower" | "nt" => Ok(RelationshipType::Narrower),
            "related" | "rt" => Ok(RelationshipType::Related),
            _ => Err(Error::invalid_enum("relationship_type", s)),
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order a pair so the lower id comes first, flipping the relation to match.
///
/// Returns `SameTerm` when both ids are equal.
pub fn canonical_pair(a: i64, b: i64, relationship: RelationshipType) -> Result<(i64, i64, RelationshipType)> {
    match a.cmp(&b) {
        std::cmp::Ordering::Equal => Err(Error::SameTerm(a)),
        std::cmp::Ordering::Less => Ok((a, b, relationship)),
        std::cmp::Ordering::Greater => Ok((b, a, relationship.inverse())),
    }
}

/// A persisted thesaurus link. Invariant: `term_id_1 < term_id_2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymLink {
    pub id: i64,
    pub term_id_1: i64,
    pub term_id_2: i64,
    pub relationship_type: RelationshipType,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl SynonymLink {
    /// Check if the link touches `term_id`
    pub fn involves(&self, term_id: i64) -> bool {
        self.term_id_1 == term_id || self.term_id_2 == term_id
    }

    /// View the link from one endpoint. `None` if the term is not an endpoint.
    pub fn seen_from(&self, term_id: i64) -> Option<SynonymNeighbor> {
        let (other_term_id, relationship) = if self.term_id_1 == term_id {
            (self.term_id_2, self.relationship_type)
        } else if self.term_id_2 == term_id {
            (self.term_id_1, self.relationship_type.inverse())
        } else {
            return None;
        };
        Some(SynonymNeighbor {
            link_id: self.id,
            other_term_id,
            relationship,
            confidence: self.confidence,
        })
    }
}

/// A related term as seen from a given term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymNeighbor {
    pub link_id: i64,
    pub other_term_id: i64,
    /// Relation read from the queried term: `Broader` means the queried
    /// term is broader than `other_term_id`
    pub relationship: RelationshipType,
    pub confidence: f64,
}

/// A persisted directed translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationLink {
    pub id: i64,
    pub source_term_id: i64,
    pub target_term_id: i64,
    /// Copied from the source term at write time
    pub source_language: String,
    /// Copied from the target term at write time
    pub target_language: String,
    pub confidence: f64,
    pub validated_by_human: bool,
    pub created_at: DateTime<Utc>,
}

impl TranslationLink {
    /// Direction of this link relative to `term_id`
    pub fn direction_for(&self, term_id: i64) -> Option<TranslationDirection> {
        if self.source_term_id == term_id {
            Some(TranslationDirection::Outgoing)
        } else if self.target_term_id == term_id {
            Some(TranslationDirection::Incoming)
        } else {
            None
        }
    }

    /// The endpoint opposite `term_id`
    pub fn counterpart(&self, term_id: i64) -> Option<i64> {
        match self.direction_for(term_id)? {
            TranslationDirection::Outgoing => Some(self.target_term_id),
            TranslationDirection::Incoming => Some(self.source_term_id),
        }
    }
}

/// Whether a term is the source or the target of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationDirection {
    Outgoing,
    Incoming,
}

impl std::fmt::Display for TranslationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationDirection::Outgoing => write!(f, "outgoing"),
            TranslationDirection::Incoming => write!(f, "incoming"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_link(a: i64, b: i64, kind: RelationshipType) -> SynonymLink {
        SynonymLink {
            id: 1,
            term_id_1: a,
            term_id_2: b,
            relationship_type: kind,
            confidence: 0.8,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_relationship_roundtrip() {
        for kind in RelationshipType::all() {
            let parsed: RelationshipType = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
            assert_eq!(kind.inverse().inverse(), *kind);
        }
        assert!("antonym".parse::<RelationshipType>().is_err());
    }

    #[test]
    fn test_canonical_pair_orders_and_flips() {
        assert_eq!(canonical_pair(2, 9, RelationshipType::Broader).unwrap(), (2, 9, RelationshipType::Broader));
        assert_eq!(canonical_pair(9, 2, RelationshipType::Broader).unwrap(), (2, 9, RelationshipType::Narrower));
        assert_eq!(canonical_pair(9, 2, RelationshipType::Related).unwrap(), (2, 9, RelationshipType::Related));
        assert!(matches!(canonical_pair(4, 4, RelationshipType::Synonym), Err(Error::SameTerm(4))));
    }

    #[test]
    fn test_seen_from_either_end() {
        let link = sample_link(3, 5, RelationshipType::Broader);
        let from_3 = link.seen_from(3).unwrap();
        assert_eq!(from_3.other_term_id, 5);
        assert_eq!(from_3.relationship, RelationshipType::Broader);

        let from_5 = link.seen_from(5).unwrap();
        assert_eq!(from_5.other_term_id, 3);
        assert_eq!(from_5.relationship, RelationshipType::Narrower);

        assert!(link.seen_from(4).is_none());
        assert!(link.involves(5));
    }

    #[test]
    fn test_translation_direction() {
        let link = TranslationLink {
            id: 1,
            source_term_id: 10,
            target_term_id: 20,
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            confidence: 0.9,
            validated_by_human: false,
            created_at: Utc::now(),
        };
        assert_eq!(link.direction_for(10), Some(TranslationDirection::Outgoing));
        assert_eq!(link.direction_for(20), Some(TranslationDirection::Incoming));
        assert_eq!(link.counterpart(20), Some(10));
        assert_eq!(link.counterpart(30), None);
    }
}
