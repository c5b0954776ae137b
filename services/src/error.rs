//! Error taxonomy shared by every diary operation.
//!
//! Storage-layer errors convert into [`DiaryError`], and `DiaryError` renders itself as an
//! HTTP response. Form handlers intercept the validation variants before that happens so
//! they can re-render the originating form instead.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::database::SqlStorageError;
use crate::users::storage::UserStorageError;

#[derive(Debug, thiserror::Error)]
pub enum DiaryError {
    #[error("Username already exists")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Entry not found")]
    NotFound,

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid mood rating '{0}': expected a whole number from 1 to 10")]
    InvalidRating(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unknown export format: {0}")]
    UnknownExportFormat(String),

    #[error("Database commit failed: {0}")]
    DatabaseCommitFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiaryError {
    /// Errors caused by what the user typed into a form.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDate(_) | Self::InvalidRating(_) | Self::InvalidInput(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound | Self::UnknownExportFormat(_) => StatusCode::NOT_FOUND,
            Self::InvalidDate(_) | Self::InvalidRating(_) | Self::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::DatabaseCommitFailure(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateUsername(_) => "duplicate_username",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotFound | Self::UnknownExportFormat(_) => "not_found",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidRating(_) => "invalid_rating",
            Self::InvalidInput(_) => "invalid_input",
            Self::DatabaseCommitFailure(_) | Self::Internal(_) => "internal_error",
        }
    }
}

/// JSON body for error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for DiaryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Something went wrong. Please try again.".to_owned()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error: self.error_code().to_owned(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<SqlStorageError> for DiaryError {
    fn from(err: SqlStorageError) -> Self {
        match err {
            SqlStorageError::Db(msg) => Self::DatabaseCommitFailure(msg),
        }
    }
}

impl From<UserStorageError> for DiaryError {
    fn from(err: UserStorageError) -> Self {
        match err {
            UserStorageError::UserAlreadyExists(username) => Self::DuplicateUsername(username),
            UserStorageError::InvalidInput(msg) => Self::InvalidInput(msg),
            UserStorageError::StorageError(msg) => Self::DatabaseCommitFailure(msg),
        }
    }
}
