use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::chart::render_mood_chart;
use super::{
    CalendarDay, SearchMode, SortOrder, calendar_view, list_entries, mood_series, search_entries,
};
use crate::database::{EntryRow, SqlStorage};
use crate::entries::EntryView;
use crate::error::DiaryError;
use crate::flash::{self, FlashMessage};
use crate::users::{AppState, CurrentUser, MaybeUser, UserStorage};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub search_type: SearchMode,
}

/// `/` for visitors without a session.
#[derive(Debug, Serialize, Deserialize)]
pub struct LandingPage {
    pub page: String,
    pub flashes: Vec<FlashMessage>,
}

/// `/` for a signed-in user.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomePage {
    pub page: String,
    pub username: String,
    pub sort: SortOrder,
    pub entries: Vec<EntryView>,
    pub flashes: Vec<FlashMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchPage {
    pub query: String,
    pub search_type: SearchMode,
    pub entries: Vec<EntryView>,
    pub flashes: Vec<FlashMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarPage {
    pub calendar: BTreeMap<String, CalendarDay>,
    pub flashes: Vec<FlashMessage>,
}

pub fn report_routes<S, U>() -> Router<AppState<S, U>>
where
    S: SqlStorage,
    U: UserStorage,
{
    Router::new()
        .route("/", get(home_handler::<S, U>))
        .route("/search", get(search_handler::<S, U>))
        .route("/mood-analysis", get(mood_chart_handler::<S, U>))
        .route("/calendar", get(calendar_handler::<S, U>))
}

fn views(entries: Vec<EntryRow>) -> Vec<EntryView> {
    entries.into_iter().map(EntryView::from).collect()
}

async fn home_handler<S, U>(
    State(state): State<AppState<S, U>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(params): Query<ListQuery>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let (jar, flashes) = flash::take(jar);

    let Some(user) = user else {
        return Ok((
            jar,
            Json(LandingPage {
                page: "landing".to_owned(),
                flashes,
            }),
        )
            .into_response());
    };

    let entries = list_entries(&state.sql_storage, user.id(), params.sort).await?;

    Ok((
        jar,
        Json(HomePage {
            page: "home".to_owned(),
            username: user.username().to_owned(),
            sort: params.sort,
            entries: views(entries),
            flashes,
        }),
    )
        .into_response())
}

async fn search_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
    Query(params): Query<SearchQuery>,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let outcome =
        search_entries(&state.sql_storage, user.id(), &params.query, params.search_type).await?;

    let (jar, mut flashes) = flash::take(jar);
    if let Some(warning) = outcome.warning {
        tracing::debug!(query = %params.query, "Date search fell back to all entries");
        flashes.push(FlashMessage::error(warning));
    }

    Ok((
        jar,
        Json(SearchPage {
            query: params.query,
            search_type: params.search_type,
            entries: views(outcome.entries),
            flashes,
        }),
    )
        .into_response())
}

/// GET /mood-analysis
async fn mood_chart_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let series = mood_series(&state.sql_storage, user.id()).await?;
    let png = render_mood_chart(&series).map_err(|e| DiaryError::Internal(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn calendar_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, DiaryError>
where
    S: SqlStorage,
    U: UserStorage,
{
    let calendar = calendar_view(&state.sql_storage, user.id()).await?;
    let (jar, flashes) = flash::take(jar);

    Ok((jar, Json(CalendarPage { calendar, flashes })).into_response())
}
