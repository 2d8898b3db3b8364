//! SQLite storage implementation
//!
//! `TermStore` holds no open connection for file databases. Every public
//! operation opens a connection, runs exactly one transaction and drops the
//! connection on return, error or not. Write transactions begin IMMEDIATE so
//! concurrent writers serialize on the database lock and the loser of a
//! uniqueness race sees the winner's row.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, TransactionBehavior};

use crate::confidence;
use crate::document::{NewDocument, ProcessingStatus, UploadedDocument};
use crate::source::{AuthoritativeSource, NewSource, SourceType, Tier};
use crate::term::{normalize_language, Gender, NewTerm, Term, TermFilter, TermPatch};
use crate::{Error, Result};
use super::schema;

static MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub(super) const SOURCE_COLUMNS: &str =
    "id, name, display_name, source_type, tier, is_active, config_json, last_updated, created_at";

pub(super) const TERM_COLUMNS: &str = "id, term, language_code, definition, source_id, document_id, page_reference, \
     gender, part_of_speech, context, preferred_term_id, confidence, created_at, updated_at";

pub(super) const DOCUMENT_COLUMNS: &str = "id, filename, original_filename, file_size, mime_type, source_id, \
     processing_status, error_message, uploaded_by, created_at, processed_at";

/// Connection settings applied to every connection the store opens
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a transaction waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed terminology store
pub struct TermStore {
    target: PathBuf,
    config: StoreConfig,
    /// Keeps a shared-cache in-memory database alive between operations
    anchor: Option<Mutex<Connection>>,
}

impl TermStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open a database file with explicit connection settings
    pub fn open_with_config(path: &Path, config: StoreConfig) -> Result<Self> {
        let store = Self {
            target: path.to_path_buf(),
            config,
            anchor: None,
        };
        let conn = store.connect()?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);
        store.initialize_schema(&conn)?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Each call gets its own database. Operations on it are serialized.
    pub fn open_in_memory() -> Result<Self> {
        let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:etex-memory-{}-{}?mode=memory&cache=shared", std::process::id(), n);
        let mut store = Self {
            target: PathBuf::from(uri),
            config: StoreConfig::default(),
            anchor: None,
        };
        let anchor = store.connect()?;
        store.initialize_schema(&anchor)?;
        store.anchor = Some(Mutex::new(anchor));
        Ok(store)
    }

    /// Check whether this store lives in memory
    pub fn is_in_memory(&self) -> bool {
        self.anchor.is_some()
    }

    /// Initialize the database schema
    fn initialize_schema(&self, conn: &Connection) -> Result<()> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version > schema::SCHEMA_VERSION {
            return Err(Error::Invalid {
                field: "user_version",
                reason: format!("database schema {} is newer than supported {}", version, schema::SCHEMA_VERSION),
            });
        }
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(&self.target, OpenFlags::default())?;
        conn.busy_timeout(self.config.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Shared-cache connections fail with SQLITE_LOCKED instead of waiting on
    /// busy_timeout, so in-memory operations run one at a time.
    fn exclusive(&self) -> Option<MutexGuard<'_, Connection>> {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` in a write transaction. Rolls back on any error.
    pub(super) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let _guard = self.exclusive();
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against one consistent snapshot
    pub(super) fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let _guard = self.exclusive();
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ========== Source Operations ==========

    /// Insert a new source. Fails with `DuplicateName` if the name is taken.
    pub fn create_source(&self, new: NewSource) -> Result<AuthoritativeSource> {
        let name = confidence::require_text("name", &new.name, 100)?;
        let display_name = confidence::require_text("display_name", &new.display_name, 255)?;
        let config_json = new.config.as_ref().map(|c| c.to_string());

        let source = self.write(|conn| {
            if source_id_by_name(conn, &name)?.is_some() {
                return Err(Error::DuplicateName(name.clone()));
            }
            conn.execute(
                r#"
                INSERT INTO authoritative_sources (name, display_name, source_type, tier, is_active, config_json, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    name,
                    display_name,
                    new.source_type.as_str(),
                    new.tier.as_i64(),
                    new.is_active,
                    config_json,
                    Utc::now(),
                ],
            )
            .map_err(|e| if is_unique_violation(&e) { Error::DuplicateName(name.clone()) } else { e.into() })?;
            require_source(conn, conn.last_insert_rowid())
        })?;

        tracing::info!("Created source {} '{}' (tier {})", source.id, source.name, source.tier);
        Ok(source)
    }

    /// Get a source by ID
    pub fn get_source(&self, id: i64) -> Result<Option<AuthoritativeSource>> {
        self.read(|conn| fetch_source(conn, id))
    }

    /// Get a source by its unique name
    pub fn get_source_by_name(&self, name: &str) -> Result<Option<AuthoritativeSource>> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM authoritative_sources WHERE name = ?1", SOURCE_COLUMNS),
                [name.trim()],
                row_to_source,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// List sources ordered by tier, then name
    pub fn list_sources(&self, active_only: bool) -> Result<Vec<AuthoritativeSource>> {
        self.read(|conn| {
            let sql = if active_only {
                format!("SELECT {} FROM authoritative_sources WHERE is_active = 1 ORDER BY tier, name", SOURCE_COLUMNS)
            } else {
                format!("SELECT {} FROM authoritative_sources ORDER BY tier, name", SOURCE_COLUMNS)
            };
            let mut stmt = conn.prepare(&sql)?;
            let sources = stmt.query_map([], row_to_source)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sources)
        })
    }

    /// Enable or disable a source
    pub fn set_source_active(&self, id: i64, active: bool) -> Result<AuthoritativeSource> {
        let source = self.write(|conn| {
            let changed = conn.execute(
                "UPDATE authoritative_sources SET is_active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            if changed == 0 {
                return Err(Error::not_found("source", id));
            }
            require_source(conn, id)
        })?;
        tracing::info!("Source {} '{}' is now {}", source.id, source.name, if active { "active" } else { "inactive" });
        Ok(source)
    }

    /// Record that a source was just synced
    pub fn mark_source_synced(&self, id: i64) -> Result<AuthoritativeSource> {
        let source = self.write(|conn| {
            let changed = conn.execute(
                "UPDATE authoritative_sources SET last_updated = ?1 WHERE id = ?2",
                params![Utc::now(), id],
            )?;
            if changed == 0 {
                return Err(Error::not_found("source", id));
            }
            require_source(conn, id)
        })?;
        tracing::info!("Marked source {} '{}' as synced", source.id, source.name);
        Ok(source)
    }

    // ========== Document Operations ==========

    /// Register an uploaded document in the `pending` state
    pub fn create_document(&self, new: NewDocument) -> Result<UploadedDocument> {
        let new = new.validated()?;

        let document = self.write(|conn| {
            if let Some(source_id) = new.source_id {
                if !row_exists(conn, "authoritative_sources", source_id)? {
                    return Err(Error::ForeignKey { field: "source_id", id: source_id });
                }
            }
            conn.execute(
                r#"
                INSERT INTO uploaded_documents (filename, original_filename, file_size, mime_type, source_id, processing_status, uploaded_by, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    new.filename,
                    new.original_filename,
                    new.file_size,
                    new.mime_type,
                    new.source_id,
                    ProcessingStatus::Pending.as_str(),
                    new.uploaded_by,
                    Utc::now(),
                ],
            )?;
            require_document(conn, conn.last_insert_rowid())
        })?;

        tracing::info!("Registered document {} '{}'", document.id, document.original_filename);
        Ok(document)
    }

    /// Get a document by ID
    pub fn get_document(&self, id: i64) -> Result<Option<UploadedDocument>> {
        self.read(|conn| fetch_document(conn, id))
    }

    /// List documents, newest first, optionally filtered by status
    pub fn list_documents(&self, status: Option<ProcessingStatus>) -> Result<Vec<UploadedDocument>> {
        self.read(|conn| {
            let documents = match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM uploaded_documents WHERE processing_status = ?1 ORDER BY created_at DESC, id DESC",
                        DOCUMENT_COLUMNS
                    ))?;
                    let rows = stmt
                        .query_map([status.as_str()], row_to_document)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM uploaded_documents ORDER BY created_at DESC, id DESC",
                        DOCUMENT_COLUMNS
                    ))?;
                    let rows = stmt
                        .query_map([], row_to_document)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            Ok(documents)
        })
    }

    /// Move a document along its processing lifecycle.
    ///
    /// Entering `completed` or `failed` stamps `processed_at`. The error
    /// message is kept only for `failed` and cleared otherwise.
    pub fn set_document_status(
        &self,
        id: i64,
        status: ProcessingStatus,
        error_message: Option<&str>,
    ) -> Result<UploadedDocument> {
        let document = self.write(|conn| {
            let current = require_document(conn, id)?;
            let next = current.processing_status.transition(status).inspect_err(|_| {
                tracing::warn!("Rejected document {} transition {} -> {}", id, current.processing_status, status);
            })?;

            let message = match next {
                ProcessingStatus::Failed => error_message.map(str::to_string),
                _ => None,
            };
            let processed_at = next.is_terminal().then(Utc::now);

            conn.execute(
                "UPDATE uploaded_documents SET processing_status = ?1, error_message = ?2, processed_at = COALESCE(?3, processed_at) WHERE id = ?4",
                params![next.as_str(), message, processed_at, id],
            )?;
            require_document(conn, id)
        })?;

        tracing::info!("Document {} is now {}", id, document.processing_status);
        Ok(document)
    }

    // ========== Term Operations ==========

    /// Insert a term. Every referenced row must exist.
    pub fn create_term(&self, new: NewTerm) -> Result<Term> {
        let new = new.validated()?;

        let term = self.write(|conn| {
            check_references(conn, new.source_id, new.document_id, new.preferred_term_id)?;
            let now = Utc::now();
            conn.execute(
                r#"
                INSERT INTO terms (term, language_code, definition, source_id, document_id, page_reference,
                                   gender, part_of_speech, context, preferred_term_id, confidence, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                "#,
                params![
                    new.text,
                    new.language_code,
                    new.definition,
                    new.source_id,
                    new.document_id,
                    new.page_reference,
                    new.gender.map(|g| g.as_str()),
                    new.part_of_speech,
                    new.context,
                    new.preferred_term_id,
                    new.confidence,
                    now,
                ],
            )?;
            require_term(conn, conn.last_insert_rowid())
        })?;

        tracing::info!("Created term {} '{}' [{}]", term.id, term.text, term.language_code);
        Ok(term)
    }

    /// Get a term by ID
    pub fn get_term(&self, id: i64) -> Result<Option<Term>> {
        self.read(|conn| fetch_term(conn, id))
    }

    /// List terms matching every set field of `filter`, ordered by ID
    pub fn find_terms(&self, filter: &TermFilter) -> Result<Vec<Term>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(language) = &filter.language {
            clauses.push("language_code = ?");
            values.push(Value::Text(normalize_language(language)?));
        }
        if let Some(source_id) = filter.source_id {
            clauses.push("source_id = ?");
            values.push(Value::Integer(source_id));
        }
        if let Some(document_id) = filter.document_id {
            clauses.push("document_id = ?");
            values.push(Value::Integer(document_id));
        }
        if let Some(text) = &filter.text {
            clauses.push("term = ?");
            values.push(Value::Text(text.trim().to_string()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {} FROM terms {} ORDER BY id", TERM_COLUMNS, where_clause);

        self.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let terms = stmt
                .query_map(params_from_iter(values.iter()), row_to_term)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(terms)
        })
    }

    /// Find the oldest term with this exact text in a language
    pub fn find_term_by_text(&self, text: &str, language: &str) -> Result<Option<Term>> {
        let filter = TermFilter::default().text(text).language(language);
        Ok(self.find_terms(&filter)?.into_iter().next())
    }

    /// Apply a partial update to a term and refresh `updated_at`.
    ///
    /// A language change is copied onto every translation touching the term;
    /// it fails with `SameLanguage` if any translation would end up with both
    /// endpoints in one language.
    pub fn update_term(&self, id: i64, patch: &TermPatch) -> Result<Term> {
        let term = self.write(|conn| {
            let current = require_term(conn, id)?;
            let mut updated = current.clone();
            patch.apply(&mut updated)?;

            check_references(
                conn,
                patch.source_id.flatten(),
                patch.document_id.flatten(),
                patch.preferred_term_id.flatten(),
            )?;
            if updated.language_code != current.language_code {
                super::links::restamp_translation_languages(conn, id, &updated.language_code)?;
            }

            conn.execute(
                r#"
                UPDATE terms SET term = ?1, language_code = ?2, definition = ?3, source_id = ?4, document_id = ?5,
                                 page_reference = ?6, gender = ?7, part_of_speech = ?8, context = ?9,
                                 preferred_term_id = ?10, confidence = ?11, updated_at = ?12
                WHERE id = ?13
                "#,
                params![
                    updated.text,
                    updated.language_code,
                    updated.definition,
                    updated.source_id,
                    updated.document_id,
                    updated.page_reference,
                    updated.gender.map(|g| g.as_str()),
                    updated.part_of_speech,
                    updated.context,
                    updated.preferred_term_id,
                    updated.confidence,
                    Utc::now(),
                    id,
                ],
            )?;
            require_term(conn, id)
        })?;

        tracing::info!("Updated term {}", id);
        Ok(term)
    }

    // ========== Statistics ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        self.read(|conn| {
            let mut documents_by_status = Vec::new();
            for status in ProcessingStatus::all() {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM uploaded_documents WHERE processing_status = ?1",
                    [status.as_str()],
                    |row| row.get(0),
                )?;
                documents_by_status.push((*status, count as usize));
            }

            Ok(StoreStats {
                sources: count_rows(conn, "authoritative_sources")?,
                documents: count_rows(conn, "uploaded_documents")?,
                terms: count_rows(conn, "terms")?,
                synonym_links: count_rows(conn, "term_synonyms")?,
                translation_links: count_rows(conn, "translations")?,
                documents_by_status,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub sources: usize,
    pub documents: usize,
    pub terms: usize,
    pub synonym_links: usize,
    pub translation_links: usize,
    pub documents_by_status: Vec<(ProcessingStatus, usize)>,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Sources: {}", self.sources)?;
        writeln!(f, "  Documents: {}", self.documents)?;
        for (status, count) in &self.documents_by_status {
            writeln!(f, "    {}: {}", status, count)?;
        }
        writeln!(f, "  Terms: {}", self.terms)?;
        writeln!(f, "  Synonym links: {}", self.synonym_links)?;
        write!(f, "  Translations: {}", self.translation_links)
    }
}

// ========== Row Helpers ==========

/// Map a domain parse failure into a rusqlite column conversion error
pub(super) fn decode<T>(index: usize, value: Result<T>) -> rusqlite::Result<T> {
    value.map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

pub(super) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

/// `table` is always one of the schema's literal table names
pub(super) fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {} WHERE id = ?1", table), [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count as usize)
}

fn check_references(
    conn: &Connection,
    source_id: Option<i64>,
    document_id: Option<i64>,
    preferred_term_id: Option<i64>,
) -> Result<()> {
    let checks = [
        ("source_id", "authoritative_sources", source_id),
        ("document_id", "uploaded_documents", document_id),
        ("preferred_term_id", "terms", preferred_term_id),
    ];
    for (field, table, id) in checks {
        if let Some(id) = id {
            if !row_exists(conn, table, id)? {
                return Err(Error::ForeignKey { field, id });
            }
        }
    }
    Ok(())
}

fn source_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row("SELECT id FROM authoritative_sources WHERE name = ?1", [name], |row| row.get(0))
        .optional()
        .map_err(Into::into)
}

pub(super) fn fetch_source(conn: &Connection, id: i64) -> Result<Option<AuthoritativeSource>> {
    conn.query_row(
        &format!("SELECT {} FROM authoritative_sources WHERE id = ?1", SOURCE_COLUMNS),
        [id],
        row_to_source,
    )
    .optional()
    .map_err(Into::into)
}

pub(super) fn require_source(conn: &Connection, id: i64) -> Result<AuthoritativeSource> {
    fetch_source(conn, id)?.ok_or_else(|| Error::not_found("source", id))
}

pub(super) fn fetch_document(conn: &Connection, id: i64) -> Result<Option<UploadedDocument>> {
    conn.query_row(
        &format!("SELECT {} FROM uploaded_documents WHERE id = ?1", DOCUMENT_COLUMNS),
        [id],
        row_to_document,
    )
    .optional()
    .map_err(Into::into)
}

pub(super) fn require_document(conn: &Connection, id: i64) -> Result<UploadedDocument> {
    fetch_document(conn, id)?.ok_or_else(|| Error::not_found("document", id))
}

pub(super) fn fetch_term(conn: &Connection, id: i64) -> Result<Option<Term>> {
    conn.query_row(&format!("SELECT {} FROM terms WHERE id = ?1", TERM_COLUMNS), [id], row_to_term)
        .optional()
        .map_err(Into::into)
}

pub(super) fn require_term(conn: &Connection, id: i64) -> Result<Term> {
    fetch_term(conn, id)?.ok_or_else(|| Error::not_found("term", id))
}

fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<AuthoritativeSource> {
    let source_type: String = row.get(3)?;
    let tier: i64 = row.get(4)?;
    let config_json: Option<String> = row.get(6)?;

    let config = match config_json {
        Some(text) => Some(serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(AuthoritativeSource {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        source_type: decode(3, source_type.parse::<SourceType>())?,
        tier: decode(4, Tier::try_from(tier))?,
        is_active: row.get(5)?,
        config,
        last_updated: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<UploadedDocument> {
    let status: String = row.get(6)?;

    Ok(UploadedDocument {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_filename: row.get(2)?,
        file_size: row.get(3)?,
        mime_type: row.get(4)?,
        source_id: row.get(5)?,
        processing_status: decode(6, status.parse::<ProcessingStatus>())?,
        error_message: row.get(7)?,
        uploaded_by: row.get(8)?,
        created_at: row.get(9)?,
        processed_at: row.get(10)?,
    })
}

pub(super) fn row_to_term(row: &rusqlite::Row) -> rusqlite::Result<Term> {
    let gender: Option<String> = row.get(7)?;

    Ok(Term {
        id: row.get(0)?,
        text: row.get(1)?,
        language_code: row.get(2)?,
        definition: row.get(3)?,
        source_id: row.get(4)?,
        document_id: row.get(5)?,
        page_reference: row.get(6)?,
        gender: decode(7, gender.map(|g| g.parse::<Gender>()).transpose())?,
        part_of_speech: row.get(8)?,
        context: row.get(9)?,
        preferred_term_id: row.get(10)?,
        confidence: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn iec(store: &TermStore) -> AuthoritativeSource {
        store
            .create_source(NewSource::new("IEC", "IEC Electropedia", SourceType::Database, Tier::Authoritative))
            .unwrap()
    }

    #[test]
    fn test_source_crud() {
        let store = TermStore::open_in_memory().unwrap();
        let config = serde_json::json!({"endpoint": "https://electropedia.org"});
        let source = store
            .create_source(
                NewSource::new("IEC", "IEC Electropedia", SourceType::Api, Tier::Authoritative).with_config(config.clone()),
            )
            .unwrap();

        let retrieved = store.get_source(source.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "IEC");
        assert_eq!(retrieved.source_type, SourceType::Api);
        assert_eq!(retrieved.config, Some(config));
        assert!(retrieved.is_active);
        assert!(retrieved.last_updated.is_none());

        let by_name = store.get_source_by_name("IEC").unwrap().unwrap();
        assert_eq!(by_name.id, source.id);
    }

    #[test]
    fn test_duplicate_source_name() {
        let store = TermStore::open_in_memory().unwrap();
        iec(&store);
        let err = store
            .create_source(NewSource::new("IEC", "Another", SourceType::Manual, Tier::Internal))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref name) if name == "IEC"));
        assert_eq!(store.stats().unwrap().sources, 1);
    }

    #[test]
    fn test_list_and_toggle_sources() {
        let store = TermStore::open_in_memory().unwrap();
        let internal = store
            .create_source(NewSource::new("GLOSSARY", "Team glossary", SourceType::Manual, Tier::Internal))
            .unwrap();
        let iec = iec(&store);

        let all = store.list_sources(false).unwrap();
        assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![iec.id, internal.id]);

        store.set_source_active(internal.id, false).unwrap();
        let active = store.list_sources(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "IEC");

        let synced = store.mark_source_synced(iec.id).unwrap();
        assert!(synced.last_updated.is_some());
        assert!(matches!(store.set_source_active(999, true), Err(Error::NotFound { entity: "source", id: 999 })));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_mutations_log_at_info() {
        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let store = TermStore::open_in_memory().unwrap();
            let iec = iec(&store);
            store.set_source_active(iec.id, false).unwrap();
            store.mark_source_synced(iec.id).unwrap();
            let en = store.create_term(NewTerm::new("capacitor", "en")).unwrap();
            let de = store.create_term(NewTerm::new("Kondensator", "de")).unwrap();
            let link = store.link_translation(en.id, de.id, 0.9, false).unwrap();
            store.validate_translation(link.id).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Created term"));
        assert!(output.contains("is now inactive"));
        assert!(output.contains("as synced"));
        assert!(output.contains("Validated translation"));
        assert!(output.lines().all(|line| line.contains("INFO")));
    }

    #[test]
    fn test_create_term_with_missing_references() {
        let store = TermStore::open_in_memory().unwrap();

        let err = store.create_term(NewTerm::new("capacitor", "en").with_source(42)).unwrap_err();
        assert!(matches!(err, Error::ForeignKey { field: "source_id", id: 42 }));

        let err = store.create_term(NewTerm::new("capacitor", "en").with_document(7, Some("p. 3"))).unwrap_err();
        assert!(matches!(err, Error::ForeignKey { field: "document_id", id: 7 }));

        let err = store.create_term(NewTerm::new("cap", "en").with_preferred(9)).unwrap_err();
        assert!(matches!(err, Error::ForeignKey { field: "preferred_term_id", id: 9 }));

        assert_eq!(store.stats().unwrap().terms, 0);
    }

    #[test]
    fn test_out_of_range_confidence_leaves_storage_unchanged() {
        let store = TermStore::open_in_memory().unwrap();
        let err = store.create_term(NewTerm::new("capacitor", "en").with_confidence(1.2)).unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
        assert_eq!(store.stats().unwrap().terms, 0);

        let term = store.create_term(NewTerm::new("capacitor", "en").with_confidence(0.95)).unwrap();
        let err = store.update_term(term.id, &TermPatch::confidence(-0.01)).unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
        assert_eq!(store.get_term(term.id).unwrap().unwrap().confidence, 0.95);
    }

    #[test]
    fn test_term_defaults_and_lookup() {
        let store = TermStore::open_in_memory().unwrap();
        let source = iec(&store);
        let term = store
            .create_term(
                NewTerm::new("Kondensator", "DE")
                    .with_source(source.id)
                    .with_gender(Gender::Masculine)
                    .with_part_of_speech("noun"),
            )
            .unwrap();

        assert_eq!(term.language_code, "de");
        assert_eq!(term.confidence, 1.0);
        assert!(term.is_asserted());
        assert_eq!(term.created_at, term.updated_at);

        let found = store.find_term_by_text("Kondensator", "de").unwrap().unwrap();
        assert_eq!(found.id, term.id);
        assert_eq!(found.gender, Some(Gender::Masculine));
        assert!(store.find_term_by_text("Kondensator", "en").unwrap().is_none());
    }

    #[test]
    fn test_find_terms_filters() {
        let store = TermStore::open_in_memory().unwrap();
        let source = iec(&store);
        let doc = store.create_document(NewDocument::new("iec_1.pdf", "iec.pdf").with_source(source.id)).unwrap();

        store.create_term(NewTerm::new("capacitor", "en").with_source(source.id)).unwrap();
        store.create_term(NewTerm::new("resistor", "en").with_document(doc.id, Some("12"))).unwrap();
        store.create_term(NewTerm::new("Widerstand", "de").with_source(source.id).with_document(doc.id, None)).unwrap();

        assert_eq!(store.find_terms(&TermFilter::default()).unwrap().len(), 3);
        assert_eq!(store.find_terms(&TermFilter::default().language("EN")).unwrap().len(), 2);
        assert_eq!(store.find_terms(&TermFilter::default().source(source.id)).unwrap().len(), 2);
        let in_doc_de = store.find_terms(&TermFilter::default().document(doc.id).language("de")).unwrap();
        assert_eq!(in_doc_de.len(), 1);
        assert_eq!(in_doc_de[0].text, "Widerstand");
    }

    #[test]
    fn test_update_term_patch() {
        let store = TermStore::open_in_memory().unwrap();
        let preferred = store.create_term(NewTerm::new("capacitor", "en")).unwrap();
        let variant = store
            .create_term(NewTerm::new("condenser", "en").with_definition("old name").with_confidence(0.7))
            .unwrap();

        let patch = TermPatch {
            preferred_term_id: Some(Some(preferred.id)),
            definition: Some(None),
            confidence: Some(0.8),
            ..TermPatch::default()
        };
        let updated = store.update_term(variant.id, &patch).unwrap();

        assert_eq!(updated.preferred_term_id, Some(preferred.id));
        assert!(updated.is_variant());
        assert_eq!(updated.definition, None);
        assert_eq!(updated.confidence, 0.8);
        assert_eq!(updated.text, "condenser");
        assert!(updated.updated_at >= variant.updated_at);
        assert_eq!(updated.created_at, variant.created_at);
    }

    #[test]
    fn test_update_term_errors() {
        let store = TermStore::open_in_memory().unwrap();
        let term = store.create_term(NewTerm::new("capacitor", "en")).unwrap();

        assert!(matches!(
            store.update_term(404, &TermPatch::confidence(0.5)),
            Err(Error::NotFound { entity: "term", id: 404 })
        ));
        assert!(matches!(store.update_term(term.id, &TermPatch::preferred(Some(term.id))), Err(Error::SameTerm(_))));
        assert!(matches!(
            store.update_term(term.id, &TermPatch::preferred(Some(77))),
            Err(Error::ForeignKey { field: "preferred_term_id", id: 77 })
        ));
    }

    #[test]
    fn test_empty_patch_still_refreshes_updated_at() {
        let store = TermStore::open_in_memory().unwrap();
        let term = store.create_term(NewTerm::new("capacitor", "en")).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let touched = store.update_term(term.id, &TermPatch::default()).unwrap();
        assert!(touched.updated_at > term.updated_at);
    }

    #[test]
    fn test_document_lifecycle() {
        let store = TermStore::open_in_memory().unwrap();
        let doc = store
            .create_document(
                NewDocument::new("20250101_iec.pdf", "iec.pdf")
                    .with_file_info(2048, "application/pdf")
                    .uploaded_by("alice"),
            )
            .unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Pending);
        assert!(doc.processed_at.is_none());

        let err = store.set_document_status(doc.id, ProcessingStatus::Completed, None).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: ProcessingStatus::Pending, to: ProcessingStatus::Completed }
        ));

        let processing = store.set_document_status(doc.id, ProcessingStatus::Processing, None).unwrap();
        assert!(processing.processed_at.is_none());

        let done = store.set_document_status(doc.id, ProcessingStatus::Completed, None).unwrap();
        assert_eq!(done.processing_status, ProcessingStatus::Completed);
        assert!(done.processed_at.is_some());

        let err = store.set_document_status(doc.id, ProcessingStatus::Processing, None).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(store.get_document(doc.id).unwrap().unwrap().processing_status, ProcessingStatus::Completed);
    }

    #[test]
    fn test_failed_document_keeps_message() {
        let store = TermStore::open_in_memory().unwrap();
        let doc = store.create_document(NewDocument::new("a_1.pdf", "a.pdf")).unwrap();

        let processing = store
            .set_document_status(doc.id, ProcessingStatus::Processing, Some("ignored"))
            .unwrap();
        assert!(processing.error_message.is_none());

        let failed = store
            .set_document_status(doc.id, ProcessingStatus::Failed, Some("encrypted PDF"))
            .unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("encrypted PDF"));
        assert!(failed.processed_at.is_some());

        assert_eq!(store.list_documents(Some(ProcessingStatus::Failed)).unwrap().len(), 1);
        assert!(store.list_documents(Some(ProcessingStatus::Pending)).unwrap().is_empty());
        assert!(matches!(
            store.set_document_status(99, ProcessingStatus::Processing, None),
            Err(Error::NotFound { entity: "document", .. })
        ));
    }

    #[test]
    fn test_document_with_missing_source() {
        let store = TermStore::open_in_memory().unwrap();
        let err = store.create_document(NewDocument::new("a_1.pdf", "a.pdf").with_source(3)).unwrap_err();
        assert!(matches!(err, Error::ForeignKey { field: "source_id", id: 3 }));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etex.db");
        {
            let store = TermStore::open(&path).unwrap();
            iec(&store);
            assert!(!store.is_in_memory());
        }
        let reopened = TermStore::open(&path).unwrap();
        assert!(reopened.get_source_by_name("IEC").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_source_creation_yields_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TermStore::open(&dir.path().join("race.db")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.create_source(NewSource::new("IATE", "IATE", SourceType::Api, Tier::Authoritative))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::DuplicateName(_))));
        assert_eq!(store.stats().unwrap().sources, 1);
    }
}
