use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::{
    DateOrder, EntriesListParams, EntryFields, EntryRow, SqlStorage, SqlStorageError, TagRow,
};

#[derive(Debug, Clone)]
struct StoredEntry {
    user_id: Uuid,
    fields: EntryFields,
    tag_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<i64, StoredEntry>,
    tags: BTreeMap<i64, String>,
    next_entry_id: i64,
    next_tag_id: i64,
    entry_reads: usize,
}

impl MockState {
    fn to_row(&self, id: i64, stored: &StoredEntry) -> EntryRow {
        let mut tags: Vec<TagRow> = stored
            .tag_ids
            .iter()
            .filter_map(|tag_id| {
                self.tags.get(tag_id).map(|name| TagRow {
                    id: *tag_id,
                    name: name.clone(),
                })
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        EntryRow {
            id,
            user_id: stored.user_id,
            title: stored.fields.title.clone(),
            content: stored.fields.content.clone(),
            date: stored.fields.date,
            mood_rating: stored.fields.mood_rating,
            tags,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

fn dedup_ids(tag_ids: &[i64]) -> Vec<i64> {
    let mut ids = tag_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// In-memory implementation of [`SqlStorage`] for tests.
///
/// Mirrors the PostgreSQL semantics that callers rely on: ids are assigned in insertion
/// order, tag names are unique, ownership filters every lookup and listings are ordered
/// by `(date, id)`.
#[derive(Clone)]
pub struct MockSqlStorage {
    is_connected: bool,
    state: Arc<RwLock<MockState>>,
}

impl Default for MockSqlStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSqlStorage {
    pub fn new() -> Self {
        Self {
            is_connected: true,
            state: Arc::default(),
        }
    }

    /// A storage whose connectivity check fails.
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            ..Self::new()
        }
    }

    /// Number of distinct tags ever created.
    pub fn tag_count(&self) -> usize {
        self.state.read().expect("lock poisoned").tags.len()
    }

    /// Number of stored entries across all users.
    pub fn entry_count(&self) -> usize {
        self.state.read().expect("lock poisoned").entries.len()
    }

    /// Number of single-entry lookups served so far.
    pub fn entry_reads(&self) -> usize {
        self.state.read().expect("lock poisoned").entry_reads
    }
}

impl SqlStorage for MockSqlStorage {
    async fn is_connected(&self) -> bool {
        self.is_connected
    }

    async fn tags_resolve(&self, name: &str) -> Result<TagRow, SqlStorageError> {
        let mut state = self.state.write().expect("lock poisoned");

        if let Some((id, existing)) = state.tags.iter().find(|(_, existing)| *existing == name) {
            return Ok(TagRow {
                id: *id,
                name: existing.clone(),
            });
        }

        state.next_tag_id += 1;
        let id = state.next_tag_id;
        state.tags.insert(id, name.to_owned());

        Ok(TagRow {
            id,
            name: name.to_owned(),
        })
    }

    async fn entries_insert(
        &self,
        user_id: Uuid,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> Result<EntryRow, SqlStorageError> {
        let mut state = self.state.write().expect("lock poisoned");

        if let Some(missing) = tag_ids.iter().find(|id| !state.tags.contains_key(*id)) {
            return Err(SqlStorageError::Db(format!(
                "foreign key violation: tag {missing} does not exist"
            )));
        }

        state.next_entry_id += 1;
        let id = state.next_entry_id;
        let now = Utc::now();
        let stored = StoredEntry {
            user_id,
            fields,
            tag_ids: dedup_ids(tag_ids),
            created_at: now,
            updated_at: now,
        };
        let row = state.to_row(id, &stored);
        state.entries.insert(id, stored);

        Ok(row)
    }

    async fn entries_get(
        &self,
        user_id: Uuid,
        id: i64,
    ) -> Result<Option<EntryRow>, SqlStorageError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.entry_reads += 1;

        Ok(state
            .entries
            .get(&id)
            .filter(|stored| stored.user_id == user_id)
            .map(|stored| state.to_row(id, stored)))
    }

    async fn entries_update(
        &self,
        user_id: Uuid,
        id: i64,
        fields: EntryFields,
        tag_ids: &[i64],
    ) -> Result<Option<EntryRow>, SqlStorageError> {
        let mut state = self.state.write().expect("lock poisoned");

        if let Some(missing) = tag_ids.iter().find(|id| !state.tags.contains_key(*id)) {
            return Err(SqlStorageError::Db(format!(
                "foreign key violation: tag {missing} does not exist"
            )));
        }

        let Some(stored) = state
            .entries
            .get_mut(&id)
            .filter(|stored| stored.user_id == user_id)
        else {
            return Ok(None);
        };

        stored.fields = fields;
        stored.tag_ids = dedup_ids(tag_ids);
        stored.updated_at = Utc::now();
        let stored = stored.clone();

        Ok(Some(state.to_row(id, &stored)))
    }

    async fn entries_delete(&self, user_id: Uuid, id: i64) -> Result<bool, SqlStorageError> {
        let mut state = self.state.write().expect("lock poisoned");

        let owned = state
            .entries
            .get(&id)
            .is_some_and(|stored| stored.user_id == user_id);
        if owned {
            state.entries.remove(&id);
        }

        Ok(owned)
    }

    async fn entries_list(
        &self,
        user_id: Uuid,
        params: EntriesListParams,
    ) -> Result<Vec<EntryRow>, SqlStorageError> {
        let state = self.state.read().expect("lock poisoned");
        let needle = params.title_contains.map(|q| q.to_lowercase());

        let mut rows: Vec<EntryRow> = state
            .entries
            .iter()
            .filter(|(_, stored)| stored.user_id == user_id)
            .filter(|(_, stored)| {
                needle
                    .as_deref()
                    .is_none_or(|q| stored.fields.title.to_lowercase().contains(q))
            })
            .filter(|(_, stored)| params.date.is_none_or(|date| stored.fields.date == date))
            .map(|(id, stored)| state.to_row(*id, stored))
            .collect();

        rows.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id)));
        if params.order == DateOrder::Descending {
            rows.reverse();
        }

        Ok(rows)
    }
}
