//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - authoritative_sources(name, display_name, source_type, tier, is_active, config_json)
//! - uploaded_documents(filename, original_filename, source_id, processing_status)
//! - terms(term, language_code, source_id, document_id, preferred_term_id, confidence)
//! - term_synonyms(term_id_1, term_id_2, relationship_type, confidence)
//! - translations(source_term_id, target_term_id, source_language, target_language)

pub mod schema;
pub mod sqlite;
mod links;
mod cascade;

pub use cascade::CascadeReport;
pub use sqlite::{StoreConfig, StoreStats, TermStore};
