//! Registration and login checks on top of [`UserStorage`].

use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::storage::{UserStorage, UserStorageError};
use crate::error::DiaryError;

/// Matches the `users.username` column width.
pub const USERNAME_MAX_CHARS: usize = 80;

fn storage_error(err: impl Into<UserStorageError>) -> DiaryError {
    let err: UserStorageError = err.into();
    err.into()
}

/// Create a user, returning its id.
///
/// Usernames are case-sensitive; a taken name fails with `DuplicateUsername`.
pub async fn register<U: UserStorage>(
    storage: &U,
    username: &str,
    password: &str,
) -> Result<Uuid, DiaryError> {
    if username.trim().is_empty() {
        return Err(DiaryError::InvalidInput("Username is required".to_owned()));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DiaryError::InvalidInput(format!(
            "Username must be at most {USERNAME_MAX_CHARS} characters"
        )));
    }
    if password.is_empty() {
        return Err(DiaryError::InvalidInput("Password is required".to_owned()));
    }

    // Fail fast before paying for the hash.
    if storage
        .get_user(username)
        .await
        .map_err(storage_error)?
        .is_some()
    {
        return Err(DiaryError::DuplicateUsername(username.to_owned()));
    }

    let password_hash =
        hash_password(password).map_err(|e| DiaryError::Internal(e.to_string()))?;

    let user = storage
        .create_user(username, &password_hash)
        .await
        .map_err(storage_error)?;

    Ok(user.id)
}

/// Verify a login attempt.
///
/// Unknown usernames and wrong passwords both fail with `InvalidCredentials`.
pub async fn authenticate<U: UserStorage>(
    storage: &U,
    username: &str,
    password: &str,
) -> Result<Uuid, DiaryError> {
    let Some(user) = storage.get_user(username).await.map_err(storage_error)? else {
        return Err(DiaryError::InvalidCredentials);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => Ok(user.id),
        Ok(false) => Err(DiaryError::InvalidCredentials),
        Err(e) => {
            tracing::error!(user_id = %user.id, "Stored password hash unusable: {}", e);
            Err(DiaryError::InvalidCredentials)
        }
    }
}
