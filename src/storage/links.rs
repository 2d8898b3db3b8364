//! Synonym and translation link operations

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::confidence;
use crate::link::{canonical_pair, RelationshipType, SynonymLink, SynonymNeighbor, TranslationDirection, TranslationLink};
use crate::term::normalize_language;
use crate::{Error, Result};
use super::sqlite::{decode, is_unique_violation, require_term, TermStore};

const SYNONYM_COLUMNS: &str = "id, term_id_1, term_id_2, relationship_type, confidence, created_at";

const TRANSLATION_COLUMNS: &str =
    "id, source_term_id, target_term_id, source_language, target_language, confidence, validated_by_human, created_at";

impl TermStore {
    // ========== Synonym Operations ==========

    /// Link two distinct terms. The pair is unordered: linking (b, a) after
    /// (a, b) fails with `DuplicatePair`.
    ///
    /// `relationship` is read from `term_a`: `Broader` means `term_a` is
    /// broader than `term_b`.
    pub fn link_synonym(
        &self,
        term_a: i64,
        term_b: i64,
        relationship: RelationshipType,
        confidence: f64,
    ) -> Result<SynonymLink> {
        let confidence = confidence::validate("confidence", confidence)?;
        let (first, second, relationship) = canonical_pair(term_a, term_b, relationship)?;
        let duplicate = || Error::DuplicatePair {
            kind: "synonym",
            first,
            second,
        };

        let link = self.write(|conn| {
            require_term(conn, first)?;
            require_term(conn, second)?;
            if synonym_between(conn, first, second)?.is_some() {
                return Err(duplicate());
            }
            conn.execute(
                r#"
                INSERT INTO term_synonyms (term_id_1, term_id_2, relationship_type, confidence, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![first, second, relationship.as_str(), confidence, Utc::now()],
            )
            .map_err(|e| if is_unique_violation(&e) { duplicate() } else { e.into() })?;

            synonym_between(conn, first, second)?.ok_or_else(|| Error::not_found("synonym link", conn.last_insert_rowid()))
        })?;

        tracing::info!("Linked terms {} and {} as {}", first, second, link.relationship_type);
        Ok(link)
    }

    /// Get the link for an unordered pair, if any
    pub fn get_synonym_link(&self, term_a: i64, term_b: i64) -> Result<Option<SynonymLink>> {
        let (first, second) = (term_a.min(term_b), term_a.max(term_b));
        self.read(|conn| synonym_between(conn, first, second))
    }

    /// All thesaurus neighbors of a term, each relation read from `term_id`
    pub fn synonyms_of(&self, term_id: i64) -> Result<Vec<SynonymNeighbor>> {
        self.read(|conn| {
            require_term(conn, term_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM term_synonyms WHERE term_id_1 = ?1 OR term_id_2 = ?1 ORDER BY id",
                SYNONYM_COLUMNS
            ))?;
            let links = stmt
                .query_map([term_id], row_to_synonym)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(links.iter().filter_map(|link| link.seen_from(term_id)).collect())
        })
    }

    /// Remove the link for an unordered pair
    pub fn unlink_synonym(&self, term_a: i64, term_b: i64) -> Result<()> {
        let (first, second) = (term_a.min(term_b), term_a.max(term_b));
        self.write(|conn| {
            let link = synonym_between(conn, first, second)?
                .ok_or_else(|| Error::not_found("synonym link", first))?;
            conn.execute("DELETE FROM term_synonyms WHERE id = ?1", [link.id])?;
            Ok(())
        })?;
        tracing::info!("Unlinked terms {} and {}", first, second);
        Ok(())
    }

    // ========== Translation Operations ==========

    /// Record that `source_term_id` translates to `target_term_id`.
    ///
    /// The terms must be in different languages. The reverse direction is a
    /// separate link.
    pub fn link_translation(
        &self,
        source_term_id: i64,
        target_term_id: i64,
        confidence: f64,
        validated_by_human: bool,
    ) -> Result<TranslationLink> {
        let confidence = confidence::validate("confidence", confidence)?;
        let duplicate = || Error::DuplicatePair {
            kind: "translation",
            first: source_term_id,
            second: target_term_id,
        };

        let link = self.write(|conn| {
            let source = require_term(conn, source_term_id)?;
            let target = require_term(conn, target_term_id)?;
            if source.language_code == target.language_code {
                return Err(Error::SameLanguage(source.language_code));
            }
            if translation_between(conn, source_term_id, target_term_id)?.is_some() {
                return Err(duplicate());
            }
            conn.execute(
                r#"
                INSERT INTO translations (source_term_id, target_term_id, source_language, target_language,
                                          confidence, validated_by_human, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    source_term_id,
                    target_term_id,
                    source.language_code,
                    target.language_code,
                    confidence,
                    validated_by_human,
                    Utc::now(),
                ],
            )
            .map_err(|e| if is_unique_violation(&e) { duplicate() } else { e.into() })?;

            require_translation(conn, conn.last_insert_rowid())
        })?;

        tracing::info!(
            "Linked translation {} [{}] -> {} [{}]",
            source_term_id,
            link.source_language,
            target_term_id,
            link.target_language
        );
        Ok(link)
    }

    /// Get a translation by ID
    pub fn get_translation(&self, id: i64) -> Result<Option<TranslationLink>> {
        self.read(|conn| fetch_translation(conn, id))
    }

    /// Every translation touching a term, in either direction
    pub fn translations_of(&self, term_id: i64) -> Result<Vec<(TranslationDirection, TranslationLink)>> {
        self.read(|conn| {
            require_term(conn, term_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM translations WHERE source_term_id = ?1 OR target_term_id = ?1 ORDER BY id",
                TRANSLATION_COLUMNS
            ))?;
            let links = stmt
                .query_map([term_id], row_to_translation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(links
                .into_iter()
                .filter_map(|link| link.direction_for(term_id).map(|dir| (dir, link)))
                .collect())
        })
    }

    /// Translations from one language into another
    pub fn translations_between(&self, source_language: &str, target_language: &str) -> Result<Vec<TranslationLink>> {
        let source_language = normalize_language(source_language)?;
        let target_language = normalize_language(target_language)?;
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM translations WHERE source_language = ?1 AND target_language = ?2 ORDER BY confidence DESC, id",
                TRANSLATION_COLUMNS
            ))?;
            let links = stmt
                .query_map([&source_language, &target_language], row_to_translation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(links)
        })
    }

    /// Mark a translation as checked by a human reviewer
    pub fn validate_translation(&self, id: i64) -> Result<TranslationLink> {
        let link = self.write(|conn| {
            let changed = conn.execute("UPDATE translations SET validated_by_human = 1 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(Error::not_found("translation", id));
            }
            require_translation(conn, id)
        })?;
        tracing::info!("Validated translation {} ({} -> {})", link.id, link.source_term_id, link.target_term_id);
        Ok(link)
    }

    /// Remove a translation
    pub fn unlink_translation(&self, id: i64) -> Result<()> {
        self.write(|conn| {
            let changed = conn.execute("DELETE FROM translations WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(Error::not_found("translation", id));
            }
            Ok(())
        })?;
        tracing::info!("Removed translation {}", id);
        Ok(())
    }
}

/// Copy a term's new language onto the translations touching it
pub(super) fn restamp_translation_languages(conn: &Connection, term_id: i64, language: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM translations WHERE source_term_id = ?1 OR target_term_id = ?1",
        TRANSLATION_COLUMNS
    ))?;
    let links = stmt
        .query_map([term_id], row_to_translation)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for link in links {
        let (source_language, target_language) = match link.direction_for(term_id) {
            Some(TranslationDirection::Outgoing) => (language, link.target_language.as_str()),
            Some(TranslationDirection::Incoming) => (link.source_language.as_str(), language),
            None => continue,
        };
        if source_language == target_language {
            return Err(Error::SameLanguage(language.to_string()));
        }
        conn.execute(
            "UPDATE translations SET source_language = ?1, target_language = ?2 WHERE id = ?3",
            params![source_language, target_language, link.id],
        )?;
    }
    Ok(())
}

fn synonym_between(conn: &Connection, first: i64, second: i64) -> Result<Option<SynonymLink>> {
    conn.query_row(
        &format!("SELECT {} FROM term_synonyms WHERE term_id_1 = ?1 AND term_id_2 = ?2", SYNONYM_COLUMNS),
        [first, second],
        row_to_synonym,
    )
    .optional()
    .map_err(Into::into)
}

fn translation_between(conn: &Connection, source_term_id: i64, target_term_id: i64) -> Result<Option<TranslationLink>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM translations WHERE source_term_id = ?1 AND target_term_id = ?2",
            TRANSLATION_COLUMNS
        ),
        [source_term_id, target_term_id],
        row_to_translation,
    )
    .optional()
    .map_err(Into::into)
}

fn fetch_translation(conn: &Connection, id: i64) -> Result<Option<TranslationLink>> {
    conn.query_row(
        &format!("SELECT {} FROM translations WHERE id = ?1", TRANSLATION_COLUMNS),
        [id],
        row_to_translation,
    )
    .optional()
    .map_err(Into::into)
}

fn require_translation(conn: &Connection, id: i64) -> Result<TranslationLink> {
    fetch_translation(conn, id)?.ok_or_else(|| Error::not_found("translation", id))
}

fn row_to_synonym(row: &rusqlite::Row) -> rusqlite::Result<SynonymLink> {
    let kind: String = row.get(3)?;

    Ok(SynonymLink {
        id: row.get(0)?,
        term_id_1: row.get(1)?,
        term_id_2: row.get(2)?,
        relationship_type: decode(3, kind.parse::<RelationshipType>())?,
        confidence: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_translation(row: &rusqlite::Row) -> rusqlite::Result<TranslationLink> {
    Ok(TranslationLink {
        id: row.get(0)?,
        source_term_id: row.get(1)?,
        target_term_id: row.get(2)?,
        source_language: row.get(3)?,
        target_language: row.get(4)?,
        confidence: row.get(5)?,
        validated_by_human: row.get(6)?,
        created_at: row.get(7)?,
    })
}
