//! Diary entries: form handling, the owner-scoped entry store and its routes.

pub mod form;
pub mod routes;
pub mod service;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::database::EntryRow;

pub use form::{EntryForm, ValidEntry};
pub use routes::entry_routes;

/// An entry as rendered on pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub mood_rating: i32,
    /// Tag names, sorted.
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EntryRow> for EntryView {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            date: row.date,
            mood_rating: row.mood_rating,
            tags: row.tags.into_iter().map(|tag| tag.name).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
