//! Cascading deletes
//!
//! Each delete runs in one write transaction in two phases:
//! 1. collect every affected row id (documents, terms)
//! 2. delete in dependency order: links, thesaurus pointers, terms,
//!    documents, source
//!
//! Readers see either the state before the delete or after it, never a term
//! row gone while its links remain.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::{Error, Result};
use super::sqlite::{row_exists, TermStore};

/// Rows removed or modified by a cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CascadeReport {
    pub sources: usize,
    pub documents: usize,
    pub terms: usize,
    pub synonym_links: usize,
    pub translation_links: usize,
    /// Surviving terms whose `preferred_term_id` was cleared
    pub preferred_refs_cleared: usize,
}

impl CascadeReport {
    /// Total rows deleted (cleared pointers are updates, not deletions)
    pub fn rows_deleted(&self) -> usize {
        self.sources + self.documents + self.terms + self.synonym_links + self.translation_links
    }
}

impl std::fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cascade:")?;
        writeln!(f, "  Sources: {}", self.sources)?;
        writeln!(f, "  Documents: {}", self.documents)?;
        writeln!(f, "  Terms: {}", self.terms)?;
        writeln!(f, "  Synonym links: {}", self.synonym_links)?;
        writeln!(f, "  Translations: {}", self.translation_links)?;
        write!(f, "  Preferred pointers cleared: {}", self.preferred_refs_cleared)
    }
}

impl TermStore {
    /// Delete a source with every document and term it owns.
    ///
    /// Terms extracted from the source's documents go too, whatever their
    /// own `source_id`.
    pub fn delete_source(&self, id: i64) -> Result<CascadeReport> {
        let report = self.write(|conn| {
            if !row_exists(conn, "authoritative_sources", id)? {
                return Err(Error::not_found("source", id));
            }

            let documents = ids_where(conn, "SELECT id FROM uploaded_documents WHERE source_id = ?1", id)?;
            let mut terms = ids_where(conn, "SELECT id FROM terms WHERE source_id = ?1", id)?;
            for document_id in &documents {
                terms.extend(ids_where(conn, "SELECT id FROM terms WHERE document_id = ?1", *document_id)?);
            }

            let mut report = purge_terms(conn, &dedup(terms))?;
            for document_id in &documents {
                report.documents += conn.execute("DELETE FROM uploaded_documents WHERE id = ?1", [document_id])?;
            }
            report.sources = conn.execute("DELETE FROM authoritative_sources WHERE id = ?1", [id])?;
            Ok(report)
        })?;

        tracing::info!("Deleted source {} ({} rows)", id, report.rows_deleted());
        Ok(report)
    }

    /// Delete a document with every term extracted from it
    pub fn delete_document(&self, id: i64) -> Result<CascadeReport> {
        let report = self.write(|conn| {
            if !row_exists(conn, "uploaded_documents", id)? {
                return Err(Error::not_found("document", id));
            }

            let terms = ids_where(conn, "SELECT id FROM terms WHERE document_id = ?1", id)?;
            let mut report = purge_terms(conn, &terms)?;
            report.documents = conn.execute("DELETE FROM uploaded_documents WHERE id = ?1", [id])?;
            Ok(report)
        })?;

        tracing::info!("Deleted document {} ({} rows)", id, report.rows_deleted());
        Ok(report)
    }

    /// Delete a term and its links. Terms preferring it are kept, with the
    /// pointer cleared.
    pub fn delete_term(&self, id: i64) -> Result<CascadeReport> {
        let report = self.write(|conn| {
            if !row_exists(conn, "terms", id)? {
                return Err(Error::not_found("term", id));
            }
            purge_terms(conn, &[id])
        })?;

        tracing::info!("Deleted term {} ({} links)", id, report.synonym_links + report.translation_links);
        Ok(report)
    }
}

fn ids_where(conn: &Connection, sql: &str, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn dedup(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Delete `doomed` terms and everything hanging off them
fn purge_terms(conn: &Connection, doomed: &[i64]) -> Result<CascadeReport> {
    let mut report = CascadeReport::default();
    let doomed_set: HashSet<i64> = doomed.iter().copied().collect();
    let now = Utc::now();

    for term_id in doomed {
        report.synonym_links += conn.execute(
            "DELETE FROM term_synonyms WHERE term_id_1 = ?1 OR term_id_2 = ?1",
            [term_id],
        )?;
        report.translation_links += conn.execute(
            "DELETE FROM translations WHERE source_term_id = ?1 OR target_term_id = ?1",
            [term_id],
        )?;
    }

    for term_id in doomed {
        let referrers = ids_where(conn, "SELECT id FROM terms WHERE preferred_term_id = ?1", *term_id)?;
        for referrer in referrers.into_iter().filter(|r| !doomed_set.contains(r)) {
            report.preferred_refs_cleared += conn.execute(
                "UPDATE terms SET preferred_term_id = NULL, updated_at = ?1 WHERE id = ?2",
                params![now, referrer],
            )?;
        }
    }

    for term_id in doomed {
        report.terms += conn.execute("DELETE FROM terms WHERE id = ?1", [term_id])?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NewDocument;
    use crate::link::RelationshipType;
    use crate::source::{NewSource, SourceType, Tier};
    use crate::term::{NewTerm, TermFilter};

    fn source(store: &TermStore, name: &str) -> i64 {
        store
            .create_source(NewSource::new(name, name, SourceType::Database, Tier::Authoritative))
            .unwrap()
            .id
    }

    #[test]
    fn test_delete_source_scenario() {
        let store = TermStore::open_in_memory().unwrap();
        let iec = source(&store, "IEC");
        let capacitor = store
            .create_term(NewTerm::new("capacitor", "en").with_source(iec).with_confidence(0.95))
            .unwrap();
        let kondensator = store
            .create_term(NewTerm::new("Kondensator", "de").with_source(iec).with_confidence(0.9))
            .unwrap();
        store.link_translation(capacitor.id, kondensator.id, 0.9, false).unwrap();

        let report = store.delete_source(iec).unwrap();
        assert_eq!(report.sources, 1);
        assert_eq!(report.terms, 2);
        assert_eq!(report.translation_links, 1);

        let stats = store.stats().unwrap();
        assert_eq!((stats.sources, stats.terms, stats.translation_links), (0, 0, 0));
    }

    #[test]
    fn test_delete_source_leaves_other_sources_untouched() {
        let store = TermStore::open_in_memory().unwrap();
        let iec = source(&store, "IEC");
        let din = source(&store, "DIN");

        let doc = store.create_document(NewDocument::new("iec_1.pdf", "iec.pdf").with_source(iec)).unwrap();
        store.create_document(NewDocument::new("iec_2.pdf", "iec2.pdf").with_source(iec)).unwrap();
        let owned = store.create_term(NewTerm::new("capacitor", "en").with_source(iec)).unwrap();
        let extracted = store
            .create_term(NewTerm::new("inductor", "en").with_document(doc.id, Some("4")))
            .unwrap();
        let kept = store.create_term(NewTerm::new("Spule", "de").with_source(din)).unwrap();
        let kept_variant = store
            .create_term(NewTerm::new("Drossel", "de").with_source(din).with_preferred(kept.id))
            .unwrap();

        store.link_translation(extracted.id, kept.id, 0.8, false).unwrap();
        store.link_synonym(owned.id, extracted.id, RelationshipType::Related, 0.5).unwrap();
        store.link_synonym(kept.id, kept_variant.id, RelationshipType::Synonym, 1.0).unwrap();

        let report = store.delete_source(iec).unwrap();
        assert_eq!(report.documents, 2);
        assert_eq!(report.terms, 2);
        assert_eq!(report.synonym_links, 1);
        assert_eq!(report.translation_links, 1);
        assert_eq!(report.rows_deleted(), 1 + 2 + 2 + 1 + 1);

        assert!(store.get_source(din).unwrap().is_some());
        let remaining = store.find_terms(&TermFilter::default()).unwrap();
        assert_eq!(remaining.iter().map(|t| t.id).collect::<Vec<_>>(), vec![kept.id, kept_variant.id]);
        assert_eq!(store.get_term(kept_variant.id).unwrap().unwrap().preferred_term_id, Some(kept.id));
        assert_eq!(store.stats().unwrap().synonym_links, 1);
    }

    #[test]
    fn test_delete_term_clears_preferred_pointer() {
        let store = TermStore::open_in_memory().unwrap();
        let preferred = store.create_term(NewTerm::new("capacitor", "en")).unwrap();
        let variant = store
            .create_term(NewTerm::new("condenser", "en").with_preferred(preferred.id))
            .unwrap();
        store.link_synonym(preferred.id, variant.id, RelationshipType::Synonym, 1.0).unwrap();

        let report = store.delete_term(preferred.id).unwrap();
        assert_eq!(report.terms, 1);
        assert_eq!(report.synonym_links, 1);
        assert_eq!(report.preferred_refs_cleared, 1);

        let survivor = store.get_term(variant.id).unwrap().unwrap();
        assert_eq!(survivor.preferred_term_id, None);
        assert!(survivor.updated_at >= variant.updated_at);
        assert!(store.synonyms_of(variant.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_document_cascades_to_extracted_terms_only() {
        let store = TermStore::open_in_memory().unwrap();
        let iec = source(&store, "IEC");
        let doc = store.create_document(NewDocument::new("iec_1.pdf", "iec.pdf").with_source(iec)).unwrap();
        let extracted = store
            .create_term(NewTerm::new("capacitor", "en").with_source(iec).with_document(doc.id, Some("1")))
            .unwrap();
        let manual = store.create_term(NewTerm::new("Kondensator", "de").with_source(iec)).unwrap();
        store.link_translation(manual.id, extracted.id, 0.9, true).unwrap();

        let report = store.delete_document(doc.id).unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.terms, 1);
        assert_eq!(report.translation_links, 1);
        assert_eq!(report.sources, 0);

        assert!(store.get_source(iec).unwrap().is_some());
        assert!(store.get_term(manual.id).unwrap().is_some());
        assert!(store.translations_of(manual.id).unwrap().is_empty());
    }

    #[test]
    fn test_chained_preferred_pointers_within_deleted_batch() {
        let store = TermStore::open_in_memory().unwrap();
        let iec = source(&store, "IEC");
        let a = store.create_term(NewTerm::new("capacitor", "en").with_source(iec)).unwrap();
        let b = store
            .create_term(NewTerm::new("condenser", "en").with_source(iec).with_preferred(a.id))
            .unwrap();
        let outside = store.create_term(NewTerm::new("cap", "en").with_preferred(b.id)).unwrap();

        let report = store.delete_source(iec).unwrap();
        assert_eq!(report.terms, 2);
        assert_eq!(report.preferred_refs_cleared, 1);
        assert_eq!(store.get_term(outside.id).unwrap().unwrap().preferred_term_id, None);
    }

    #[test]
    fn test_delete_missing_rows() {
        let store = TermStore::open_in_memory().unwrap();
        assert!(matches!(store.delete_source(1), Err(Error::NotFound { entity: "source", id: 1 })));
        assert!(matches!(store.delete_document(1), Err(Error::NotFound { entity: "document", .. })));
        assert!(matches!(store.delete_term(1), Err(Error::NotFound { entity: "term", .. })));
    }
}
