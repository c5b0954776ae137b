//! Read-side views over a user's entries: listing, search, the mood series behind the
//! chart, and the calendar.

pub mod chart;
pub mod routes;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::{DateOrder, EntriesListParams, EntryRow, SqlStorage};
use crate::entries::form::parse_date;
use crate::error::DiaryError;

pub use routes::report_routes;

pub const DATE_FORMAT_WARNING: &str = "Please enter date in YYYY-MM-DD format";

/// `?sort=` on the entry list. Anything but `latest` sorts oldest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SortOrder {
    #[default]
    Latest,
    Oldest,
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        match value.as_str() {
            "latest" => Self::Latest,
            _ => Self::Oldest,
        }
    }
}

impl From<SortOrder> for DateOrder {
    fn from(sort: SortOrder) -> Self {
        match sort {
            SortOrder::Latest => Self::Descending,
            SortOrder::Oldest => Self::Ascending,
        }
    }
}

/// `?search_type=` on the search page. Anything but `title` searches by date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SearchMode {
    #[default]
    Title,
    Date,
}

impl From<String> for SearchMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "title" => Self::Title,
            _ => Self::Date,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub entries: Vec<EntryRow>,
    /// Set when the query could not be used and the results are unfiltered.
    pub warning: Option<String>,
}

/// One calendar cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub mood: i32,
    pub title: String,
}

pub async fn list_entries<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    sort: SortOrder,
) -> Result<Vec<EntryRow>, DiaryError> {
    let params = EntriesListParams {
        order: sort.into(),
        ..Default::default()
    };
    Ok(storage.entries_list(owner, params).await?)
}

/// Search by title substring or exact date, newest first.
///
/// A blank query returns everything. An unparsable date also returns everything, with
/// a warning for the user.
pub async fn search_entries<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    query: &str,
    mode: SearchMode,
) -> Result<SearchOutcome, DiaryError> {
    let query = query.trim();
    let mut params = EntriesListParams::default();
    let mut warning = None;

    if !query.is_empty() {
        match mode {
            SearchMode::Title => params.title_contains = Some(query.to_owned()),
            SearchMode::Date => match parse_date(query) {
                Ok(date) => params.date = Some(date),
                Err(_) => warning = Some(DATE_FORMAT_WARNING.to_owned()),
            },
        }
    }

    Ok(SearchOutcome {
        entries: storage.entries_list(owner, params).await?,
        warning,
    })
}

/// `(date, rating)` pairs, oldest first.
pub async fn mood_series<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
) -> Result<Vec<(NaiveDate, i32)>, DiaryError> {
    let entries = list_entries(storage, owner, SortOrder::Oldest).await?;
    Ok(entries
        .into_iter()
        .map(|entry| (entry.date, entry.mood_rating))
        .collect())
}

/// Fold entries into one cell per day. Later entries in the slice win.
pub fn build_calendar(entries: &[EntryRow]) -> BTreeMap<String, CalendarDay> {
    let mut calendar = BTreeMap::new();
    for entry in entries {
        calendar.insert(
            entry.date.format("%Y-%m-%d").to_string(),
            CalendarDay {
                mood: entry.mood_rating,
                title: entry.title.clone(),
            },
        );
    }
    calendar
}

/// Calendar keyed by `YYYY-MM-DD`; on a shared day the most recently created entry wins.
pub async fn calendar_view<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
) -> Result<BTreeMap<String, CalendarDay>, DiaryError> {
    let entries = list_entries(storage, owner, SortOrder::Oldest).await?;
    Ok(build_calendar(&entries))
}
