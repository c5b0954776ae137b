//! HTTP routes for creating, viewing, editing and deleting entries.
//!
//! All routes require a session. Entry ids that are malformed, missing, or owned by
//! someone else all answer `404`.

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::form::EntryForm;
use super::{EntryView, service};
use crate::database::SqlStorage;
use crate::error::DiaryError;
use crate::flash::{self, FlashMessage};
use crate::users::{AppState, CurrentUser, UserStorage};

/// A single entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryPage {
    pub entry: EntryView,
    pub flashes: Vec<FlashMessage>,
}

/// The new and edit entry forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryFormPage {
    /// `"new_entry"` or `"edit_entry"`.
    pub page: String,
    /// Set when editing.
    pub entry_id: Option<i64>,
    pub form: EntryForm,
    pub flashes: Vec<FlashMessage>,
}

pub fn entry_routes<S, U>() -> Router<AppState<S, U>>
where
    S: SqlStorage,
    U: UserStorage,
{
    Router::new()
        .route(
            "/entry/new",
            get(new_entry_page::<S, U>).post(create_entry_handler::<S, U>),
        )
        .route("/entry/{id}", get(view_entry_handler::<S, U>))
        .route("/entry/{id}/delete", post(delete_entry_handler::<S, U>))
        .route(
            "/entry/{id}/edit",
            get(edit_entry_page::<S, U>).post(update_entry_handler::<S, U>),
        )
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_entry_id(raw: &str) -> Result<i64, DiaryError> {
    raw.parse().map_err(|_| DiaryError::NotFound)
}

fn form_page(
    jar: CookieJar,
    status: StatusCode,
    entry_id: Option<i64>,
    form: EntryForm,
    extra: Option<FlashMessage>,
) -> Response {
    let (jar, mut flashes) = flash::take(jar);
    flashes.extend(extra);
    let page = if entry_id.is_some() {
        "edit_entry"
    } else {
        "new_entry"
    };

    (
        status,
        jar,
        Json(EntryFormPage {
            page: page.to_owned(),
            entry_id,
            form,
            flashes,
        }),
    )
        .into_response()
}

fn done(jar: CookieJar, message: &str) -> Response {
    (flash::push(jar, FlashMessage::info(message)), Redirect::to("/")).into_response()
}

async fn new_entry_page<S, U>(_user: CurrentUser, jar: CookieJar) -> Response
where
    S: SqlStorage,
    U: UserStorage,
{
    form_page(jar, StatusCode::OK, None, EntryForm::blank(today()), None)
}

/// POST /entry/new
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
async fn create_entry_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<EntryForm>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let entry = match form.validate(today()) {
        Ok(entry) => entry,
        Err(e) if e.is_validation() => {
            tracing::debug!("Rejected entry form: {}", e);
            return Ok(form_page(
                jar,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                form,
                Some(FlashMessage::error(e.to_string())),
            ));
        }
        Err(e) => return Err(e),
    };

    service::create_entry(&state.sql_storage, user.id(), entry).await?;
    Ok(done(jar, "Entry created successfully!"))
}

/// GET /entry/{id}
async fn view_entry_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let id = parse_entry_id(&id)?;
    let entry = service::read_entry(&state.sql_storage, user.id(), id).await?;
    let (jar, flashes) = flash::take(jar);

    Ok((
        jar,
        Json(EntryPage {
            entry: entry.into(),
            flashes,
        }),
    )
        .into_response())
}

/// POST /entry/{id}/delete
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
async fn delete_entry_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let id = parse_entry_id(&id)?;
    service::delete_entry(&state.sql_storage, user.id(), id).await?;
    Ok(done(jar, "Entry deleted successfully!"))
}

/// GET /entry/{id}/edit
async fn edit_entry_page<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let id = parse_entry_id(&id)?;
    let entry = service::read_entry(&state.sql_storage, user.id(), id).await?;

    Ok(form_page(
        jar,
        StatusCode::OK,
        Some(id),
        EntryForm::from_entry(&entry),
        None,
    ))
}

/// POST /entry/{id}/edit
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
async fn update_entry_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<EntryForm>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let id = parse_entry_id(&id)?;

    let entry = match form.validate(today()) {
        Ok(entry) => entry,
        Err(e) if e.is_validation() => {
            // Someone else's entry is a 404 even when the submission is invalid.
            service::read_entry(&state.sql_storage, user.id(), id).await?;
            tracing::debug!(entry_id = id, "Rejected entry form: {}", e);
            return Ok(form_page(
                jar,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(id),
                form,
                Some(FlashMessage::error(e.to_string())),
            ));
        }
        Err(e) => return Err(e),
    };

    service::update_entry(&state.sql_storage, user.id(), id, entry).await?;
    Ok(done(jar, "Entry updated successfully!"))
}
