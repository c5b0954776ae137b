//! PostgreSQL implementation of [`SqlStorage`].
//!
//! Schema lives in `migrations/`:
//!
//! ```sql
//! entries (id BIGSERIAL, user_id UUID REFERENCES users ON DELETE CASCADE,
//!          title, content, entry_date DATE, mood_rating INTEGER, ...)
//! tags (id BIGSERIAL, name UNIQUE)
//! entry_tags (entry_id REFERENCES entries ON DELETE CASCADE, tag_id,
//!             PRIMARY KEY (entry_id, tag_id))
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    DateOrder, EntriesListParams, EntryFields, EntryRow, SqlStorage, SqlStorageError, TagRow,
};

const ENTRY_COLUMNS: &str =
    "id, user_id, title, content, entry_date, mood_rating, created_at, updated_at";

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRecord {
    id: i64,
    user_id: Uuid,
    title: String,
    content: String,
    entry_date: NaiveDate,
    mood_rating: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntryRecord {
    fn into_row(self, tags: Vec<TagRow>) -> EntryRow {
        EntryRow {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            date: self.entry_date,
            mood_rating: self.mood_rating,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT INTO entry_tags (entry_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(entry_id)
        .bind(*tag_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

impl PgStorage {
    /// Load tags for a batch of entries, keyed by entry id.
    async fn tags_for_entries(
        &self,
        entry_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TagRow>>, SqlStorageError> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT et.entry_id, t.id, t.name
            FROM entry_tags et
            INNER JOIN tags t ON t.id = et.tag_id
            WHERE et.entry_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_entry: HashMap<i64, Vec<TagRow>> = HashMap::new();
        for (entry_id, id, name) in rows {
            by_entry.entry(entry_id).or_default().push(TagRow { id, name });
        }
        Ok(by_entry)
    }

    async fn attach_tags(
        &self,
        records: Vec<EntryRecord>,
    ) -> Result<Vec<EntryRow>, SqlStorageError> {
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for_entries(&ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let entry_tags = tags.remove(&record.id).unwrap_or_default();
                record.into_row(entry_tags)
            })
            .collect())
    }
}

impl SqlStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn tags_resolve(&self, name: &str) -> Result<TagRow, SqlStorageError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let tag = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(tag)
    }

    async fn entries_insert(
        &self,
        user_id: Uuid,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> Result<EntryRow, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, EntryRecord>(&format!(
            r#"
            INSERT INTO entries (user_id, title, content, entry_date, mood_rating)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.date)
        .bind(fields.mood_rating)
        .fetch_one(&mut *tx)
        .await?;

        link_tags(&mut tx, record.id, tag_ids).await?;
        tx.commit().await?;

        let mut rows = self.attach_tags(vec![record]).await?;
        rows.pop()
            .ok_or_else(|| SqlStorageError::Db("inserted entry vanished".to_owned()))
    }

    async fn entries_get(
        &self,
        user_id: Uuid,
        id: i64,
    ) -> Result<Option<EntryRow>, SqlStorageError> {
        let record = sqlx::query_as::<_, EntryRecord>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(self.attach_tags(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn entries_update(
        &self,
        user_id: Uuid,
        id: i64,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> Result<Option<EntryRow>, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, EntryRecord>(&format!(
            r#"
            UPDATE entries
            SET title = $3, content = $4, entry_date = $5, mood_rating = $6, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.date)
        .bind(fields.mood_rating)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back.
        let Some(record) = record else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM entry_tags WHERE entry_id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;
        link_tags(&mut tx, record.id, tag_ids).await?;
        tx.commit().await?;

        Ok(self.attach_tags(vec![record]).await?.pop())
    }

    async fn entries_delete(&self, user_id: Uuid, id: i64) -> Result<bool, SqlStorageError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn entries_list(
        &self,
        user_id: Uuid,
        params: EntriesListParams,
    ) -> Result<Vec<EntryRow>, SqlStorageError> {
        let direction = match params.order {
            DateOrder::Ascending => "ASC",
            DateOrder::Descending => "DESC",
        };
        let pattern = params.title_contains.as_deref().map(escape_like);

        let records = sqlx::query_as::<_, EntryRecord>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR title ILIKE '%' || $2 || '%' ESCAPE '\')
              AND ($3::DATE IS NULL OR entry_date = $3)
            ORDER BY entry_date {direction}, id {direction}
            "#
        ))
        .bind(user_id)
        .bind(pattern)
        .bind(params.date)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(records).await
    }
}
