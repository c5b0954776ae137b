//! Relational storage for diary entries and tags.
//!
//! The [`SqlStorage`] trait is the seam between request handling and persistence:
//! - [`PgStorage`]: PostgreSQL implementation backed by a sqlx pool
//! - [`MockSqlStorage`]: in-memory implementation for tests
//!
//! Every entry operation takes the owning user's id and filters on it, so an entry that
//! belongs to someone else is indistinguishable from one that does not exist.

mod mock;
mod pg;

pub use mock::MockSqlStorage;
pub use pg::PgStorage;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use uuid::Uuid;

use crate::config::Config;

/// Initialize a PostgreSQL connection pool
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url())
        .await?;

    tracing::info!("Database connection pool established");

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations applied");

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SqlStorageError {
    #[error("Database error: {0}")]
    Db(String),
}

impl From<sqlx::Error> for SqlStorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

/// A globally shared tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
}

/// A diary entry together with its tags (sorted by name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub mood_rating: i32,
    pub tags: Vec<TagRow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntryRow {
    /// Tag names joined by a comma, as shown in forms and exports.
    pub fn tag_list(&self) -> String {
        self.tags
            .iter()
            .map(|tag| tag.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Validated user-editable fields of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub mood_rating: i32,
}

/// Direction of the `(date, id)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    Ascending,
    #[default]
    Descending,
}

/// Filters for listing a user's entries. `None` means "no filter".
#[derive(Debug, Clone, Default)]
pub struct EntriesListParams {
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    /// Exact entry date.
    pub date: Option<NaiveDate>,
    pub order: DateOrder,
}

pub trait SqlStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Return the tag with exactly this name, creating it if needed.
    fn tags_resolve(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<TagRow, SqlStorageError>> + Send;

    /// Insert an entry and link it to `tag_ids` in one transaction.
    fn entries_insert(
        &self,
        user_id: Uuid,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> impl Future<Output = Result<EntryRow, SqlStorageError>> + Send;

    fn entries_get(
        &self,
        user_id: Uuid,
        id: i64,
    ) -> impl Future<Output = Result<Option<EntryRow>, SqlStorageError>> + Send;

    /// Replace an entry's fields and its full tag set. `None` if not owned by `user_id`.
    fn entries_update(
        &self,
        user_id: Uuid,
        id: i64,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> impl Future<Output = Result<Option<EntryRow>, SqlStorageError>> + Send;

    /// Returns `true` if a row owned by `user_id` was deleted.
    fn entries_delete(
        &self,
        user_id: Uuid,
        id: i64,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// List entries ordered by `(date, id)` in the requested direction.
    fn entries_list(
        &self,
        user_id: Uuid,
        params: EntriesListParams,
    ) -> impl Future<Output = Result<Vec<EntryRow>, SqlStorageError>> + Send;
}
