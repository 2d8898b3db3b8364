//! Database schema definitions
//!
//! Referential actions:
//! - sources own terms and documents (deleted by the store's cascade routine)
//! - documents own their extracted terms
//! - `terms.source_id`, `terms.document_id`, `terms.preferred_term_id` and
//!   `uploaded_documents.source_id` are SET NULL references
//! - link rows CASCADE with either endpoint term

/// Bumped whenever a statement below changes shape
pub const SCHEMA_VERSION: i64 = 1;

/// SQL to create the authoritative_sources table
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS authoritative_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    source_type TEXT NOT NULL,
    tier INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    config_json TEXT,
    last_updated TEXT,
    created_at TEXT NOT NULL,
    CONSTRAINT ck_source_type CHECK (source_type IN ('api', 'pdf', 'database', 'manual')),
    CONSTRAINT ck_tier CHECK (tier IN (1, 2, 3))
)
"#;

/// SQL to create the uploaded_documents table
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS uploaded_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    file_size INTEGER,
    mime_type TEXT,
    source_id INTEGER REFERENCES authoritative_sources(id) ON DELETE SET NULL,
    processing_status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    uploaded_by TEXT,
    created_at TEXT NOT NULL,
    processed_at TEXT,
    CONSTRAINT ck_processing_status CHECK (processing_status IN ('pending', 'processing', 'completed', 'failed'))
)
"#;

/// SQL to create the terms table
pub const CREATE_TERMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    term TEXT NOT NULL,
    language_code TEXT NOT NULL,
    definition TEXT,
    source_id INTEGER REFERENCES authoritative_sources(id) ON DELETE SET NULL,
    document_id INTEGER REFERENCES uploaded_documents(id) ON DELETE SET NULL,
    page_reference TEXT,
    gender TEXT,
    part_of_speech TEXT,
    context TEXT,
    preferred_term_id INTEGER REFERENCES terms(id) ON DELETE SET NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT ck_gender CHECK (gender IS NULL OR gender IN ('m', 'f', 'n')),
    CONSTRAINT ck_confidence CHECK (confidence >= 0.0 AND confidence <= 1.0)
)
"#;

/// SQL to create the term_synonyms table
/// Pairs are stored lower id first, so the UNIQUE pair also covers the reversed pair
pub const CREATE_SYNONYMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS term_synonyms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    term_id_1 INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
    term_id_2 INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL DEFAULT 'synonym',
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    CONSTRAINT uq_term_synonym_pair UNIQUE (term_id_1, term_id_2),
    CONSTRAINT ck_relationship_type CHECK (relationship_type IN ('synonym', 'broader', 'narrower', 'related')),
    CONSTRAINT ck_synonym_confidence CHECK (confidence >= 0.0 AND confidence <= 1.0),
    CONSTRAINT ck_different_terms CHECK (term_id_1 != term_id_2),
    CONSTRAINT ck_canonical_order CHECK (term_id_1 < term_id_2)
)
"#;

/// SQL to create the translations table
pub const CREATE_TRANSLATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
    target_term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
    source_language TEXT NOT NULL,
    target_language TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    validated_by_human INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    CONSTRAINT uq_translation_pair UNIQUE (source_term_id, target_term_id),
    CONSTRAINT ck_different_languages CHECK (source_language != target_language),
    CONSTRAINT ck_translation_confidence CHECK (confidence >= 0.0 AND confidence <= 1.0)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_authoritative_source_tier ON authoritative_sources(tier)",
    "CREATE INDEX IF NOT EXISTS idx_authoritative_source_active ON authoritative_sources(is_active)",
    "CREATE INDEX IF NOT EXISTS idx_term_language ON terms(term, language_code)",
    "CREATE INDEX IF NOT EXISTS idx_term_source ON terms(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_term_language_code ON terms(language_code)",
    "CREATE INDEX IF NOT EXISTS idx_term_document ON terms(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_term_preferred ON terms(preferred_term_id)",
    "CREATE INDEX IF NOT EXISTS idx_synonym_term1 ON term_synonyms(term_id_1)",
    "CREATE INDEX IF NOT EXISTS idx_synonym_term2 ON term_synonyms(term_id_2)",
    "CREATE INDEX IF NOT EXISTS idx_translation_source ON translations(source_term_id)",
    "CREATE INDEX IF NOT EXISTS idx_translation_target ON translations(target_term_id)",
    "CREATE INDEX IF NOT EXISTS idx_translation_languages ON translations(source_language, target_language)",
    "CREATE INDEX IF NOT EXISTS idx_document_status ON uploaded_documents(processing_status)",
    "CREATE INDEX IF NOT EXISTS idx_document_source ON uploaded_documents(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_document_created ON uploaded_documents(created_at)",
];

/// All schema creation statements, in dependency order
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_SOURCES_TABLE,
        CREATE_DOCUMENTS_TABLE,
        CREATE_TERMS_TABLE,
        CREATE_SYNONYMS_TABLE,
        CREATE_TRANSLATIONS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
