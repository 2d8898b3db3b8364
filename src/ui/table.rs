use tabled::{settings::Style, Table, Tabled};

use crate::{AuthoritativeSource, Term, TranslationDirection, TranslationLink, UploadedDocument};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        render(&self.rows)
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Render rows as a rounded table, or nothing when empty
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
pub struct SourceRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Display name")]
    pub display_name: String,
    #[tabled(rename = "Type")]
    pub source_type: String,
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&AuthoritativeSource> for SourceRow {
    fn from(source: &AuthoritativeSource) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            display_name: source.display_name.clone(),
            source_type: source.source_type.to_string(),
            tier: format!("{} ({})", source.tier, source.tier.label()),
            active: if source.is_active { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct TermRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Term")]
    pub text: String,
    #[tabled(rename = "Lang")]
    pub language: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    #[tabled(rename = "Preferred")]
    pub preferred: String,
}

impl From<&Term> for TermRow {
    fn from(term: &Term) -> Self {
        Self {
            id: term.id,
            text: term.text.clone(),
            language: term.language_code.clone(),
            confidence: format!("{:.2}", term.confidence),
            preferred: term.preferred_term_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
pub struct TranslationRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Direction")]
    pub direction: String,
    #[tabled(rename = "Other term")]
    pub other_term: i64,
    #[tabled(rename = "Languages")]
    pub languages: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    #[tabled(rename = "Validated")]
    pub validated: String,
}

impl TranslationRow {
    pub fn new(term_id: i64, direction: TranslationDirection, link: &TranslationLink) -> Self {
        Self {
            id: link.id,
            direction: direction.to_string(),
            other_term: link.counterpart(term_id).unwrap_or_default(),
            languages: format!("{} → {}", link.source_language, link.target_language),
            confidence: format!("{:.2}", link.confidence),
            validated: if link.validated_by_human { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct DocumentRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "File")]
    pub original_filename: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Error")]
    pub error: String,
}

impl From<&UploadedDocument> for DocumentRow {
    fn from(document: &UploadedDocument) -> Self {
        Self {
            id: document.id,
            original_filename: document.original_filename.clone(),
            status: document.processing_status.to_string(),
            error: document.error_message.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(render::<TermRow>(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_contains_rows() {
        let table = stats_table(&[("Terms", "3"), ("Sources", "1")]);
        assert!(table.contains("Terms"));
        assert!(table.contains("Metric"));
    }
}
