//! User storage trait and implementations.
//!
//! The module follows the repository pattern with trait-based abstraction:
//! - `UserStorage` trait: interface for credential persistence
//! - `PgUserStorage`: PostgreSQL implementation using the shared `PgStorage` pool
//! - `MockUserStorage`: In-memory implementation for testing
//!
//! Only password hashes are stored; hashing happens in [`super::password`].

use crate::database::PgStorage;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Represents a stored user with their password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    /// The unique user ID.
    pub id: Uuid,
    /// The unique, case-sensitive username.
    pub username: String,
    /// Argon2 hash in PHC string format.
    pub password_hash: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    /// Creates a new `StoredUser` instance with a generated UUID.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Error type for user storage operations.
#[derive(Debug, thiserror::Error)]
pub enum UserStorageError {
    /// The username is already taken.
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    /// A database or storage error occurred.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Trait for user storage operations.
///
/// Usernames are matched exactly (case-sensitive).
pub trait UserStorage: Clone + Send + Sync + 'static {
    /// The error type for storage operations.
    type Error: std::error::Error + Into<UserStorageError> + Send + Sync + 'static;

    /// Creates a new user with the given username and password hash.
    ///
    /// Fails with `UserAlreadyExists` if the username is taken.
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<StoredUser, Self::Error>> + Send;

    /// Retrieves a user by username.
    fn get_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, Self::Error>> + Send;

    /// Records a logged-out session token hash until the token would have expired.
    fn revoke_session(
        &self,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Whether a session token hash was revoked by a logout.
    fn is_session_revoked(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// In-memory mock implementation of `UserStorage` for testing.
///
/// # Example
///
/// ```
/// use diary_services::users::storage::MockUserStorage;
///
/// let storage = MockUserStorage::new();
/// assert!(storage.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockUserStorage {
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
    revoked_sessions: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    fail_writes: bool,
}

impl MockUserStorage {
    /// Creates a new empty `MockUserStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A storage whose writes fail as if the database rejected the commit.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Returns the number of users in the storage.
    pub fn len(&self) -> usize {
        self.users.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of revoked session hashes held.
    pub fn revoked_session_count(&self) -> usize {
        self.revoked_sessions.read().expect("lock poisoned").len()
    }
}

impl UserStorage for MockUserStorage {
    type Error = UserStorageError;

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<StoredUser, Self::Error> {
        if username.is_empty() {
            return Err(UserStorageError::InvalidInput(
                "Username cannot be empty".to_owned(),
            ));
        }

        if password_hash.is_empty() {
            return Err(UserStorageError::InvalidInput(
                "Password hash cannot be empty".to_owned(),
            ));
        }

        if self.fail_writes {
            return Err(UserStorageError::StorageError(
                "simulated commit failure".to_owned(),
            ));
        }

        let mut users = self.users.write().expect("lock poisoned");

        if users.contains_key(username) {
            return Err(UserStorageError::UserAlreadyExists(username.to_owned()));
        }

        let user = StoredUser::new(username, password_hash);
        users.insert(username.to_owned(), user.clone());

        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, Self::Error> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users.get(username).cloned())
    }

    async fn revoke_session(
        &self,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(UserStorageError::StorageError(
                "simulated commit failure".to_owned(),
            ));
        }

        let mut revoked = self.revoked_sessions.write().expect("lock poisoned");
        let now = Utc::now();
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(token_hash.to_owned(), expires_at);
        Ok(())
    }

    async fn is_session_revoked(&self, token_hash: &str) -> Result<bool, Self::Error> {
        let revoked = self.revoked_sessions.read().expect("lock poisoned");
        Ok(revoked.contains_key(token_hash))
    }
}

/// PostgreSQL implementation of `UserStorage` for production use.
///
/// # Table Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(80) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
#[derive(Clone)]
pub struct PgUserStorage {
    storage: PgStorage,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for StoredUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

impl PgUserStorage {
    /// Creates a new `PgUserStorage` instance wrapping the given `PgStorage`.
    pub fn new(storage: PgStorage) -> Self {
        Self { storage }
    }
}

impl UserStorage for PgUserStorage {
    type Error = UserStorageError;

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<StoredUser, Self::Error> {
        if username.is_empty() {
            return Err(UserStorageError::InvalidInput(
                "Username cannot be empty".to_owned(),
            ));
        }

        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.storage.pool)
        .await
        .map_err(|e| UserStorageError::StorageError(e.to_string()))?;

        match result {
            Some(row) => Ok(row.into()),
            None => Err(UserStorageError::UserAlreadyExists(username.to_owned())),
        }
    }

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, Self::Error> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.storage.pool)
        .await
        .map_err(|e| UserStorageError::StorageError(e.to_string()))?;

        Ok(result.map(StoredUser::from))
    }

    async fn revoke_session(
        &self,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        let mut tx = self
            .storage
            .pool
            .begin()
            .await
            .map_err(|e| UserStorageError::StorageError(e.to_string()))?;

        // Rows past their token's expiry no longer protect anything.
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < now()")
            .execute(&mut *tx)
            .await
            .map_err(|e| UserStorageError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO revoked_sessions (token_hash, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| UserStorageError::StorageError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| UserStorageError::StorageError(e.to_string()))
    }

    async fn is_session_revoked(&self, token_hash: &str) -> Result<bool, Self::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM revoked_sessions WHERE token_hash = $1)",
        )
        .bind(token_hash)
        .fetch_one(&self.storage.pool)
        .await
        .map_err(|e| UserStorageError::StorageError(e.to_string()))
    }
}
