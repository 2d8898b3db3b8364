//! Terms - one lexical entry in one language
//!
//! A term optionally points at:
//! - the source it came from (`source_id`)
//! - the document it was extracted from (`document_id`, `page_reference`)
//! - its preferred synonym (`preferred_term_id`, the thesaurus pointer)
//!
//! All three are weak references: deleting the target nulls the pointer.

use crate::confidence::{self, DEFAULT_CONFIDENCE, MAX_LANGUAGE_LEN, MAX_TERM_LEN};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Grammatical gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Masculine,
    #[serde(rename = "f")]
    Feminine,
    #[serde(rename = "n")]
    Neuter,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Masculine => "m",
            Gender::Feminine => "f",
            Gender::Neuter => "n",
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "masculine" => Ok(Gender::Masculine),
            "f" | "feminine" => Ok(Gender::Feminine),
            "n" | "neuter" => Ok(Gender::Neuter),
            _ => Err(Error::invalid_enum("gender", s)),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize an ISO 639-1 style language code ("EN" -> "en", "pt-BR" -> "pt-br")
pub fn normalize_language(code: &str) -> Result<String> {
    let code = code.trim().to_lowercase();
    let valid_chars = code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if code.len() < 2 || code.len() > MAX_LANGUAGE_LEN || !valid_chars || code.starts_with('-') {
        return Err(Error::Invalid {
            field: "language_code",
            reason: format!("'{}' is not a language code", code),
        });
    }
    Ok(code)
}

/// A persisted term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: i64,
    pub text: String,
    pub language_code: String,
    pub definition: Option<String>,
    pub source_id: Option<i64>,
    pub document_id: Option<i64>,
    pub page_reference: Option<String>,
    pub gender: Option<Gender>,
    pub part_of_speech: Option<String>,
    pub context: Option<String>,
    pub preferred_term_id: Option<i64>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Term {
    /// Check if this term is a non-preferred variant of another term
    pub fn is_variant(&self) -> bool {
        self.preferred_term_id.is_some()
    }

    /// Check if this term was asserted rather than extracted
    pub fn is_asserted(&self) -> bool {
        confidence::is_asserted(self.confidence)
    }
}

/// Insert request for a term.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTerm {
    pub text: String,
    pub language_code: String,
    pub definition: Option<String>,
    pub source_id: Option<i64>,
    pub document_id: Option<i64>,
    pub page_reference: Option<String>,
    pub gender: Option<Gender>,
    pub part_of_speech: Option<String>,
    pub context: Option<String>,
    pub preferred_term_id: Option<i64>,
    pub confidence: f64,
}

impl NewTerm {
    /// Create a bare term with full confidence
    pub fn new(text: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: language_code.into(),
            definition: None,
            source_id: None,
            document_id: None,
            page_reference: None,
            gender: None,
            part_of_speech: None,
            context: None,
            preferred_term_id: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Attach the document and page the term was extracted from
    pub fn with_document(mut self, document_id: i64, page_reference: Option<&str>) -> Self {
        self.document_id = Some(document_id);
        self.page_reference = page_reference.map(str::to_string);
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_part_of_speech(mut self, part_of_speech: impl Into<String>) -> Self {
        self.part_of_speech = Some(part_of_speech.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_preferred(mut self, preferred_term_id: i64) -> Self {
        self.preferred_term_id = Some(preferred_term_id);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Validate and normalize the fields that carry constraints
    pub(crate) fn validated(mut self) -> Result<Self> {
        self.text = confidence::require_text("term", &self.text, MAX_TERM_LEN)?;
        self.language_code = normalize_language(&self.language_code)?;
        self.confidence = confidence::validate("confidence", self.confidence)?;
        Ok(self)
    }
}

/// Partial update for a term.
///
/// `None` leaves a field untouched; for nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermPatch {
    pub text: Option<String>,
    pub language_code: Option<String>,
    pub definition: Option<Option<String>>,
    pub source_id: Option<Option<i64>>,
    pub document_id: Option<Option<i64>>,
    pub page_reference: Option<Option<String>>,
    pub gender: Option<Option<Gender>>,
    pub part_of_speech: Option<Option<String>>,
    pub context: Option<Option<String>>,
    pub preferred_term_id: Option<Option<i64>>,
    pub confidence: Option<f64>,
}

impl TermPatch {
    pub fn confidence(value: f64) -> Self {
        Self {
            confidence: Some(value),
            ..Self::default()
        }
    }

    pub fn definition(value: impl Into<String>) -> Self {
        Self {
            definition: Some(Some(value.into())),
            ..Self::default()
        }
    }

    pub fn preferred(term_id: Option<i64>) -> Self {
        Self {
            preferred_term_id: Some(term_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch onto `term`, re-validating every touched field.
    ///
    /// References are not checked here; the store verifies them in the
    /// same transaction as the write.
    pub(crate) fn apply(&self, term: &mut Term) -> Result<()> {
        if let Some(text) = &self.text {
            term.text = confidence::require_text("term", text, MAX_TERM_LEN)?;
        }
        if let Some(code) = &self.language_code {
            term.language_code = normalize_language(code)?;
        }
        if let Some(value) = self.confidence {
            term.confidence = confidence::validate("confidence", value)?;
        }
        if let Some(preferred) = self.preferred_term_id {
            if preferred == Some(term.id) {
                return Err(Error::SameTerm(term.id));
            }
            term.preferred_term_id = preferred;
        }
        if let Some(definition) = &self.definition {
            term.definition = definition.clone();
        }
        if let Some(source_id) = self.source_id {
            term.source_id = source_id;
        }
        if let Some(document_id) = self.document_id {
            term.document_id = document_id;
        }
        if let Some(page_reference) = &self.page_reference {
            term.page_reference = page_reference.clone();
        }
        if let Some(gender) = self.gender {
            term.gender = gender;
        }
        if let Some(part_of_speech) = &self.part_of_speech {
            term.part_of_speech = part_of_speech.clone();
        }
        if let Some(context) = &self.context {
            term.context = context.clone();
        }
        Ok(())
    }
}

/// Filter for listing terms. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFilter {
    pub language: Option<String>,
    pub source_id: Option<i64>,
    pub document_id: Option<i64>,
    /// Exact term text
    pub text: Option<String>,
}

impl TermFilter {
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    pub fn source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn document(mut self, document_id: i64) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
