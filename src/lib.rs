//! # ETEx - Terminology Knowledge Base
//!
//! Multilingual terminology store with provenance tracking.
//!
//! ETEx provides:
//! - Authoritative sources ranked by tier (authoritative, translator, internal)
//! - Terms in any language with definitions, grammar and confidence scores
//! - Symmetric thesaurus links (synonym, broader, narrower, related)
//! - Directed cross-language translation links
//! - Uploaded document tracking with a processing state machine
//! - SQLite-backed storage with transactional cascading deletes

pub mod confidence;
pub mod source;
pub mod term;
pub mod link;
pub mod document;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use source::{AuthoritativeSource, NewSource, SourceType, Tier};
pub use term::{Gender, NewTerm, Term, TermFilter, TermPatch};
pub use link::{RelationshipType, SynonymLink, SynonymNeighbor, TranslationDirection, TranslationLink};
pub use document::{NewDocument, ProcessingStatus, UploadedDocument};
pub use storage::{CascadeReport, StoreConfig, StoreStats, TermStore};

/// Result type alias for ETEx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ETEx operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Source name already exists: {0}")]
    DuplicateName(String),

    #[error("{kind} link already exists between terms {first} and {second}")]
    DuplicatePair {
        kind: &'static str,
        first: i64,
        second: i64,
    },

    #[error("Invalid {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("{field} must be within [0.0, 1.0], got {value}")]
    Range { field: &'static str, value: f64 },

    #[error("Term {0} cannot be linked to itself")]
    SameTerm(i64),

    #[error("Translation endpoints share language '{0}'")]
    SameLanguage(String),

    #[error("Illegal document status transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("{field} references missing row {id}")]
    ForeignKey { field: &'static str, id: i64 },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }

    pub(crate) fn invalid_enum(field: &'static str, value: impl ToString) -> Self {
        Error::InvalidEnum {
            field,
            value: value.to_string(),
        }
    }
}
