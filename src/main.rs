//! ETEx CLI - Command-line interface for the terminology knowledge base

use clap::{Parser, Subcommand};
use etex::config::{self, EtexConfig};
use etex::ui::{self, Icons};
use etex::{
    NewDocument, NewSource, NewTerm, ProcessingStatus, RelationshipType, SourceType, TermFilter, TermStore, Tier,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "etex")]
#[command(version)]
#[command(about = "Terminology knowledge base - multilingual terms, synonyms and translations")]
#[command(long_about = r#"
ETEx records terms across languages, links synonyms and translations,
and tracks where every term came from.

Example usage:
  etex add-source IEC --display-name "IEC Electropedia" --kind database --tier 1
  etex add-term capacitor --lang en --source IEC --confidence 0.95
  etex add-term Kondensator --lang de --source IEC --confidence 0.9
  etex translate 1 2 --confidence 0.9
  etex translations 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides DATABASE_URL and etex.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write etex.toml and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show row counts
    Stats,

    /// List authoritative sources
    Sources {
        /// Include inactive sources
        #[arg(short, long)]
        all: bool,
    },

    /// Register an authoritative source
    AddSource {
        /// Unique short name (IATE, IEC, DIN)
        name: String,

        #[arg(long)]
        display_name: Option<String>,

        /// api, pdf, database or manual
        #[arg(short, long, default_value = "manual")]
        kind: String,

        /// 1 (authoritative), 2 (translator) or 3 (internal)
        #[arg(short, long, default_value = "1")]
        tier: String,

        /// Source-specific settings as JSON
        #[arg(long)]
        settings: Option<String>,

        #[arg(long)]
        inactive: bool,
    },

    /// Add a term
    AddTerm {
        text: String,

        /// ISO 639-1 language code
        #[arg(short, long)]
        lang: String,

        /// Source name
        #[arg(short, long)]
        source: Option<String>,

        /// Document the term was extracted from
        #[arg(long)]
        document: Option<i64>,

        #[arg(long)]
        page: Option<String>,

        #[arg(long)]
        definition: Option<String>,

        /// m, f or n
        #[arg(long)]
        gender: Option<String>,

        /// ID of the preferred synonym
        #[arg(long)]
        preferred: Option<i64>,

        #[arg(long, default_value = "1.0")]
        confidence: f64,
    },

    /// List terms
    Terms {
        #[arg(short, long)]
        lang: Option<String>,

        /// Source name
        #[arg(short, long)]
        source: Option<String>,

        #[arg(long)]
        document: Option<i64>,
    },

    /// Link two terms in the thesaurus
    Synonym {
        first: i64,
        second: i64,

        /// synonym, broader, narrower or related (read from the first term)
        #[arg(short, long, default_value = "synonym")]
        kind: String,

        #[arg(long, default_value = "1.0")]
        confidence: f64,
    },

    /// Show thesaurus neighbors of a term
    Synonyms { term: i64 },

    /// Record a translation from one term to another
    Translate {
        source_term: i64,
        target_term: i64,

        #[arg(long, default_value = "1.0")]
        confidence: f64,

        /// Mark as checked by a human
        #[arg(long)]
        validated: bool,
    },

    /// Show translations of a term in both directions
    Translations { term: i64 },

    /// Register an uploaded document
    AddDocument {
        /// Storage filename
        filename: String,

        #[arg(long)]
        original: Option<String>,

        /// Source name
        #[arg(short, long)]
        source: Option<String>,
    },

    /// List documents
    Documents {
        /// pending, processing, completed or failed
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Move a document to a new processing status
    DocStatus {
        id: i64,
        status: String,

        #[arg(long)]
        error: Option<String>,
    },

    /// Delete a source with all its documents and terms
    DeleteSource { name: String },

    /// Delete a document with all terms extracted from it
    DeleteDocument { id: i64 },

    /// Delete a term and its links
    DeleteTerm { id: i64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = config::load_config(cli.config.as_deref())?;
    let env_url = std::env::var(config::DATABASE_URL_ENV).ok();
    let database = config::resolve_database_path(cli.database.as_deref(), env_url.as_deref(), file_config.as_ref())?;
    let store_config = file_config.clone().unwrap_or_default().store_config();

    if let Commands::Init { force } = cli.command {
        let path = cli.config.clone().unwrap_or_else(config::default_config_path);
        let etex_config = EtexConfig {
            database: Some(database.display().to_string()),
            ..file_config.unwrap_or_default()
        };
        config::write_config(&path, &etex_config, force)?;
        config::ensure_db_dir(&database)?;
        TermStore::open_with_config(&database, store_config)?;
        ui::success(&format!("Initialized {}", path.display()));
        ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
        return Ok(());
    }

    config::ensure_db_dir(&database)?;
    tracing::debug!("Using database {}", database.display());
    let store = TermStore::open_with_config(&database, store_config)?;
    let source_id = |name: &str| -> anyhow::Result<i64> {
        match store.get_source_by_name(name)? {
            Some(source) => Ok(source.id),
            None => anyhow::bail!("no source named '{}'", name),
        }
    };

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Stats => {
            let stats = store.stats()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} ETEx Statistics ({})", Icons::STATS, database.display());
                let counts = [
                    ("Sources", stats.sources.to_string()),
                    ("Documents", stats.documents.to_string()),
                    ("Terms", stats.terms.to_string()),
                    ("Synonym links", stats.synonym_links.to_string()),
                    ("Translations", stats.translation_links.to_string()),
                ];
                let rows: Vec<(&str, &str)> = counts.iter().map(|(k, v)| (*k, v.as_str())).collect();
                println!("{}", ui::stats_table(&rows));
                ui::section("Documents by status");
                for (status, count) in &stats.documents_by_status {
                    ui::summary_row(status.as_str(), &count.to_string());
                }
            }
        }

        Commands::Sources { all } => {
            let sources = store.list_sources(!all)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sources)?);
            } else if sources.is_empty() {
                ui::warn("No sources found.");
            } else {
                let rows: Vec<ui::SourceRow> = sources.iter().map(Into::into).collect();
                println!("{}", ui::render(&rows));
            }
        }

        Commands::AddSource { name, display_name, kind, tier, settings, inactive } => {
            let source_type: SourceType = kind.parse()?;
            let tier: Tier = tier.parse()?;
            let display_name = display_name.unwrap_or_else(|| name.clone());
            let mut new = NewSource::new(name, display_name, source_type, tier);
            if let Some(settings) = settings {
                new = new.with_config(serde_json::from_str(&settings)?);
            }
            if inactive {
                new = new.inactive();
            }
            let source = store.create_source(new)?;
            ui::success(&format!(
                "Added source {} (id {}, tier {})",
                source.name.style(ui::theme().tier(source.tier)),
                source.id,
                source.tier.label()
            ));
        }

        Commands::AddTerm { text, lang, source, document, page, definition, gender, preferred, confidence } => {
            let mut new = NewTerm::new(text, lang).with_confidence(confidence);
            if let Some(name) = source {
                new = new.with_source(source_id(&name)?);
            }
            if let Some(document_id) = document {
                new = new.with_document(document_id, page.as_deref());
            }
            if let Some(definition) = definition {
                new = new.with_definition(definition);
            }
            if let Some(gender) = gender {
                new = new.with_gender(gender.parse()?);
            }
            if let Some(preferred) = preferred {
                new = new.with_preferred(preferred);
            }
            let term = store.create_term(new)?;
            ui::success(&format!("Added term '{}' [{}] (id {})", term.text, term.language_code, term.id));
        }

        Commands::Terms { lang, source, document } => {
            let mut filter = TermFilter::default();
            filter.language = lang;
            filter.document_id = document;
            if let Some(name) = source {
                filter.source_id = Some(source_id(&name)?);
            }
            let terms = store.find_terms(&filter)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&terms)?);
            } else if terms.is_empty() {
                ui::warn("No terms found.");
            } else {
                let rows: Vec<ui::TermRow> = terms.iter().map(Into::into).collect();
                println!("{}", ui::render(&rows));
            }
        }

        Commands::Synonym { first, second, kind, confidence } => {
            let relationship: RelationshipType = kind.parse()?;
            let link = store.link_synonym(first, second, relationship, confidence)?;
            ui::success(&format!(
                "{} Linked {} and {} as {} (link {})",
                Icons::LINK,
                link.term_id_1,
                link.term_id_2,
                link.relationship_type,
                link.id
            ));
        }

        Commands::Synonyms { term } => {
            let neighbors = store.synonyms_of(term)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&neighbors)?);
            } else if neighbors.is_empty() {
                ui::warn("No thesaurus links.");
            } else {
                println!("{} Thesaurus for term {}", Icons::BOOK, term);
                for neighbor in neighbors {
                    let other = store.get_term(neighbor.other_term_id)?;
                    let label = other.map(|t| t.text).unwrap_or_default();
                    println!(
                        "- {} {} (id {}, conf {:.2})",
                        neighbor.relationship.to_string().style(ui::theme().relationship(neighbor.relationship)),
                        label,
                        neighbor.other_term_id,
                        neighbor.confidence
                    );
                }
            }
        }

        Commands::Translate { source_term, target_term, confidence, validated } => {
            let link = store.link_translation(source_term, target_term, confidence, validated)?;
            ui::success(&format!(
                "{} {} → {} (link {})",
                Icons::GLOBE,
                link.source_language,
                link.target_language,
                link.id
            ));
        }

        Commands::Translations { term } => {
            let links = store.translations_of(term)?;
            if cli.json {
                let values: Vec<_> = links.iter().map(|(_, link)| link).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if links.is_empty() {
                ui::warn("No translations.");
            } else {
                let rows: Vec<ui::TranslationRow> = links
                    .iter()
                    .map(|(direction, link)| ui::TranslationRow::new(term, *direction, link))
                    .collect();
                println!("{}", ui::render(&rows));
            }
        }

        Commands::AddDocument { filename, original, source } => {
            let original = original.unwrap_or_else(|| filename.clone());
            let mut new = NewDocument::new(filename, original);
            if let Some(name) = source {
                new = new.with_source(source_id(&name)?);
            }
            let document = store.create_document(new)?;
            ui::success(&format!("{} Registered document {} ({})", Icons::FILE, document.id, document.processing_status));
        }

        Commands::Documents { status } => {
            let status = status.map(|s| s.parse::<ProcessingStatus>()).transpose()?;
            let documents = store.list_documents(status)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else if documents.is_empty() {
                ui::warn("No documents found.");
            } else {
                let rows: Vec<ui::DocumentRow> = documents.iter().map(Into::into).collect();
                println!("{}", ui::render(&rows));
            }
        }

        Commands::DocStatus { id, status, error } => {
            let status: ProcessingStatus = status.parse()?;
            let document = store.set_document_status(id, status, error.as_deref())?;
            println!(
                "{} Document {} is now {}",
                Icons::CHECK,
                document.id,
                document.processing_status.to_string().style(ui::theme().status(document.processing_status))
            );
            if let Some(processed_at) = document.processed_at {
                ui::info("Processed at", &processed_at.to_rfc3339());
            }
        }

        Commands::DeleteSource { name } => {
            let report = store.delete_source(source_id(&name)?)?;
            println!("{} Deleted source '{}'", Icons::DEL, name);
            println!("{}", ui::dim(&report.to_string()));
        }

        Commands::DeleteDocument { id } => {
            let report = store.delete_document(id)?;
            println!("{} Deleted document {}", Icons::DEL, id);
            println!("{}", ui::dim(&report.to_string()));
        }

        Commands::DeleteTerm { id } => {
            let report = store.delete_term(id)?;
            println!("{} Deleted term {}", Icons::DEL, id);
            println!("{}", ui::dim(&report.to_string()));
        }
    }

    Ok(())
}
