//! Entry store operations, scoped to the owning user.
//!
//! An entry that belongs to another user is reported as `NotFound`.

use uuid::Uuid;

use super::form::ValidEntry;
use crate::database::{EntryRow, SqlStorage, TagRow};
use crate::error::DiaryError;

/// Reuse-or-create each named tag.
pub async fn resolve_tags<S: SqlStorage>(
    storage: &S,
    names: &[String],
) -> Result<Vec<TagRow>, DiaryError> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        tags.push(storage.tags_resolve(name).await?);
    }
    Ok(tags)
}

fn tag_ids(tags: &[TagRow]) -> Vec<i64> {
    tags.iter().map(|tag| tag.id).collect()
}

pub async fn create_entry<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    entry: ValidEntry,
) -> Result<EntryRow, DiaryError> {
    let tags = resolve_tags(storage, &entry.tag_names).await?;
    let row = storage
        .entries_insert(owner, entry.fields, &tag_ids(&tags))
        .await?;

    tracing::info!(user_id = %owner, entry_id = row.id, tags = tags.len(), "Entry created");
    Ok(row)
}

pub async fn read_entry<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    id: i64,
) -> Result<EntryRow, DiaryError> {
    storage
        .entries_get(owner, id)
        .await?
        .ok_or(DiaryError::NotFound)
}

/// Replace an entry's fields and tags.
pub async fn update_entry<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    id: i64,
    entry: ValidEntry,
) -> Result<EntryRow, DiaryError> {
    // Check ownership before creating any tags.
    read_entry(storage, owner, id).await?;

    let tags = resolve_tags(storage, &entry.tag_names).await?;
    let row = storage
        .entries_update(owner, id, entry.fields, &tag_ids(&tags))
        .await?
        .ok_or(DiaryError::NotFound)?;

    tracing::info!(user_id = %owner, entry_id = id, "Entry updated");
    Ok(row)
}

pub async fn delete_entry<S: SqlStorage>(
    storage: &S,
    owner: Uuid,
    id: i64,
) -> Result<(), DiaryError> {
    if !storage.entries_delete(owner, id).await? {
        return Err(DiaryError::NotFound);
    }

    tracing::info!(user_id = %owner, entry_id = id, "Entry deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{EntryFields, MockSqlStorage};
    use chrono::NaiveDate;

    fn valid(title: &str, tags: &[&str]) -> ValidEntry {
        ValidEntry {
            fields: EntryFields {
                title: title.to_owned(),
                content: "body".to_owned(),
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                mood_rating: 4,
            },
            tag_names: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn names(row: &EntryRow) -> Vec<&str> {
        row.tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let storage = MockSqlStorage::new();
        let owner = Uuid::new_v4();

        let created = create_entry(&storage, owner, valid("Walk", &["happy", "calm"]))
            .await
            .unwrap();
        let read = read_entry(&storage, owner, created.id).await.unwrap();

        assert_eq!(read, created);
        assert_eq!(read.title, "Walk");
        assert_eq!(read.mood_rating, 4);
        assert_eq!(names(&read), ["calm", "happy"]);
    }

    #[tokio::test]
    async fn tags_are_shared_across_entries() {
        let storage = MockSqlStorage::new();
        let owner = Uuid::new_v4();

        let first = create_entry(&storage, owner, valid("One", &["work"]))
            .await
            .unwrap();
        let second = create_entry(&storage, Uuid::new_v4(), valid("Two", &["work"]))
            .await
            .unwrap();

        assert_eq!(first.tags[0].id, second.tags[0].id);
        assert_eq!(storage.tag_count(), 1);
    }

    #[tokio::test]
    async fn update_replaces_tags() {
        let storage = MockSqlStorage::new();
        let owner = Uuid::new_v4();
        let entry = create_entry(&storage, owner, valid("Walk", &["a", "b"]))
            .await
            .unwrap();

        let updated = update_entry(&storage, owner, entry.id, valid("Run", &["c"]))
            .await
            .unwrap();

        assert_eq!(updated.title, "Run");
        assert_eq!(names(&updated), ["c"]);
        // Orphaned tags are kept.
        assert_eq!(storage.tag_count(), 3);
    }

    #[tokio::test]
    async fn foreign_entries_are_not_found() {
        let storage = MockSqlStorage::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let entry = create_entry(&storage, owner, valid("Mine", &[]))
            .await
            .unwrap();

        assert!(matches!(
            read_entry(&storage, intruder, entry.id).await,
            Err(DiaryError::NotFound)
        ));
        assert!(matches!(
            update_entry(&storage, intruder, entry.id, valid("Theirs", &["new"])).await,
            Err(DiaryError::NotFound)
        ));
        assert!(matches!(
            delete_entry(&storage, intruder, entry.id).await,
            Err(DiaryError::NotFound)
        ));
        assert_eq!(storage.tag_count(), 0);
        assert_eq!(storage.entry_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let storage = MockSqlStorage::new();
        let owner = Uuid::new_v4();
        let entry = create_entry(&storage, owner, valid("Gone", &[]))
            .await
            .unwrap();

        delete_entry(&storage, owner, entry.id).await.unwrap();

        assert!(matches!(
            read_entry(&storage, owner, entry.id).await,
            Err(DiaryError::NotFound)
        ));
    }
}
