//! Uploaded documents and their processing lifecycle
//!
//! ```text
//! pending ──► processing ──► completed
//!                  │
//!                  └───────► failed
//! ```
//!
//! `completed` and `failed` are terminal. Any other edge is rejected.

use crate::confidence;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum stored length of a filename
pub const MAX_FILENAME_LEN: usize = 500;

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn all() -> &'static [ProcessingStatus] {
        &[
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (ProcessingStatus::Pending, ProcessingStatus::Processing)
                | (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
        )
    }

    /// Validate the edge `self -> next`
    pub fn transition(self, next: ProcessingStatus) -> Result<ProcessingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition { from: self, to: next })
        }
    }
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        ProcessingStatus::Pending
    }
}

impl FromStr for ProcessingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" | "done" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            _ => Err(Error::invalid_enum("processing_status", s)),
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: i64,
    /// Storage filename (with timestamp/hash)
    pub filename: String,
    pub original_filename: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub source_id: Option<i64>,
    pub processing_status: ProcessingStatus,
    /// Set only while the document is `failed`
    pub error_message: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Stamped on entering `completed` or `failed`
    pub processed_at: Option<DateTime<Utc>>,
}

/// Insert request for a document. Documents always start `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub filename: String,
    pub original_filename: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub source_id: Option<i64>,
    pub uploaded_by: Option<String>,
}

impl NewDocument {
    pub fn new(filename: impl Into<String>, original_filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            original_filename: original_filename.into(),
            file_size: None,
            mime_type: None,
            source_id: None,
            uploaded_by: None,
        }
    }

    pub fn with_source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_file_info(mut self, file_size: i64, mime_type: impl Into<String>) -> Self {
        self.file_size = Some(file_size);
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn uploaded_by(mut self, user: impl Into<String>) -> Self {
        self.uploaded_by = Some(user.into());
        self
    }

    pub(crate) fn validated(mut self) -> Result<Self> {
        self.filename = confidence::require_text("filename", &self.filename, MAX_FILENAME_LEN)?;
        self.original_filename =
            confidence::require_text("original_filename", &self.original_filename, MAX_FILENAME_LEN)?;
        if let Some(size) = self.file_size {
            if size < 0 {
                return Err(Error::Invalid {
                    field: "file_size",
                    reason: format!("negative size {}", size),
                });
            }
        }
        Ok(self)
    }
}
