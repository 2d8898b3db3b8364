use owo_colors::Style;
use std::sync::OnceLock;

use crate::document::ProcessingStatus;
use crate::link::RelationshipType;
use crate::source::Tier;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles, resolved once per process
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// Indexed by tier rank, authoritative first
    tiers: [Style; 3],
}

impl Theme {
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            tiers: [
                Style::new().green().bold(),
                Style::new().blue(),
                Style::new().bright_black(),
            ],
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            tiers: [Style::new(), Style::new(), Style::new()],
        }
    }

    pub fn tier(&self, tier: Tier) -> Style {
        let rank = match tier {
            Tier::Authoritative => 0,
            Tier::Translator => 1,
            Tier::Internal => 2,
        };
        self.tiers[rank].clone()
    }

    pub fn status(&self, status: ProcessingStatus) -> Style {
        match status {
            ProcessingStatus::Pending => self.dim.clone(),
            ProcessingStatus::Processing => self.info.clone(),
            ProcessingStatus::Completed => self.success.clone(),
            ProcessingStatus::Failed => self.error.clone(),
        }
    }

    /// Hierarchical relations share the header style
    pub fn relationship(&self, relationship: RelationshipType) -> Style {
        match relationship {
            RelationshipType::Synonym => self.success.clone(),
            RelationshipType::Broader | RelationshipType::Narrower => self.header.clone(),
            RelationshipType::Related => self.info.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
