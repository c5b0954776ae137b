//! Whole-diary downloads as CSV or PDF.

pub mod csv;
pub mod pdf;
pub mod routes;

use std::str::FromStr;
use uuid::Uuid;

use crate::database::SqlStorage;
use crate::error::DiaryError;
use crate::reports::{SortOrder, list_entries};

pub use routes::export_routes;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(String),
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

impl From<::csv::Error> for ExportError {
    fn from(err: ::csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<ExportError> for DiaryError {
    fn from(err: ExportError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "diary_entries.csv",
            Self::Pdf => "diary_entries.pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = DiaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            other => Err(DiaryError::UnknownExportFormat(other.to_owned())),
        }
    }
}

/// Encode all of `owner`'s entries, oldest first.
pub async fn export_entries<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    format: ExportFormat,
) -> Result<Vec<u8>, DiaryError> {
    let entries = list_entries(storage, owner, SortOrder::Oldest).await?;

    let bytes = match format {
        ExportFormat::Csv => csv::entries_to_csv(&entries)?,
        ExportFormat::Pdf => pdf::entries_to_pdf(&entries)?,
    };

    tracing::info!(user_id = %owner, ?format, entries = entries.len(), "Diary exported");
    Ok(bytes)
}
