use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use super::{ExportFormat, export_entries};
use crate::database::SqlStorage;
use crate::error::DiaryError;
use crate::users::{AppState, CurrentUser, UserStorage};

pub fn export_routes<S, U>() -> Router<AppState<S, U>>
where
    S: SqlStorage,
    U: UserStorage,
{
    Router::new().route("/export/{format}", get(export_handler::<S, U>))
}

/// GET /export/{csv|pdf}
///
/// Any other format is a 404.
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
async fn export_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    Path(format): Path<String>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let format: ExportFormat = format.parse()?;
    let bytes = export_entries(&state.sql_storage, user.id(), format).await?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}
