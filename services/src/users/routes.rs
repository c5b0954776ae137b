//! HTTP routes for signup, login and logout.
//!
//! Pages are JSON documents; forms are `application/x-www-form-urlencoded`. Successful
//! submissions redirect with `303 See Other` and leave a flash message behind.

use axum::{
    Extension, Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::credentials::{authenticate, register};
use super::revocation_cache::RevocationCache;
use super::session::{generate_session_token, removal_cookie, session_cookie};
use super::session_auth::{CurrentUser, revoke_session};
use super::storage::UserStorage;
use crate::config::Config;
use crate::database::SqlStorage;
use crate::error::DiaryError;
use crate::flash::{self, FlashMessage};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState<S, U> {
    pub sql_storage: S,
    pub user_storage: U,
    pub revocations: RevocationCache,
}

impl<S, U> AppState<S, U> {
    /// Creates a new `AppState` with the given storage implementations.
    pub fn new(sql_storage: S, user_storage: U) -> Self {
        Self {
            sql_storage,
            user_storage,
            revocations: RevocationCache::default(),
        }
    }
}

/// Submitted login or signup form.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// The login and signup pages.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthPage {
    /// `"login"` or `"signup"`.
    pub page: String,
    /// Username echoed back after a failed submission.
    pub username: String,
    pub flashes: Vec<FlashMessage>,
}

fn auth_page(
    jar: CookieJar,
    status: StatusCode,
    page: &str,
    username: &str,
    extra: Option<FlashMessage>,
) -> Response {
    let (jar, mut flashes) = flash::take(jar);
    flashes.extend(extra);

    (
        status,
        jar,
        Json(AuthPage {
            page: page.to_owned(),
            username: username.to_owned(),
            flashes,
        }),
    )
        .into_response()
}

/// Creates the router for authentication pages.
pub fn auth_routes<S, U>() -> Router<AppState<S, U>>
where
    S: SqlStorage,
    U: UserStorage,
{
    Router::new()
        .route("/login", get(login_page).post(login_handler::<S, U>))
        .route("/signup", get(signup_page).post(signup_handler::<S, U>))
        .route("/logout", get(logout_handler::<S, U>))
}

async fn login_page(jar: CookieJar) -> Response {
    auth_page(jar, StatusCode::OK, "login", "", None)
}

async fn signup_page(jar: CookieJar) -> Response {
    auth_page(jar, StatusCode::OK, "signup", "", None)
}

/// POST /login
///
/// On success sets the `diary_session` cookie and redirects to `/`; otherwise the login
/// page is rendered again with `401`.
#[tracing::instrument(skip_all)]
async fn login_handler<S, U>(
    State(state): State<AppState<S, U>>,
    Extension(config): Extension<Config>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response
where
    S: SqlStorage,
    U: UserStorage,
{
    let user_id = match authenticate(&state.user_storage, &form.username, &form.password).await {
        Ok(user_id) => user_id,
        Err(DiaryError::InvalidCredentials) => {
            tracing::warn!(username = %form.username, "Login failed");
            return auth_page(
                jar,
                StatusCode::UNAUTHORIZED,
                "login",
                &form.username,
                Some(FlashMessage::error(
                    DiaryError::InvalidCredentials.to_string(),
                )),
            );
        }
        Err(e) => return e.into_response(),
    };

    let token = match generate_session_token(user_id, &form.username, config.jwt_secret()) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to generate session token: {}", e);
            return DiaryError::Internal(e.to_string()).into_response();
        }
    };

    tracing::info!(user_id = %user_id, "User logged in");
    let jar = jar.add(session_cookie(token, config.secure_cookies()));
    (jar, Redirect::to("/")).into_response()
}

/// POST /signup
#[tracing::instrument(skip_all)]
async fn signup_handler<S, U>(
    State(state): State<AppState<S, U>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response
where
    S: SqlStorage,
    U: UserStorage,
{
    match register(&state.user_storage, &form.username, &form.password).await {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "User registered");
            let jar = flash::push(
                jar,
                FlashMessage::info("Account created successfully! Please log in."),
            );
            (jar, Redirect::to("/login")).into_response()
        }
        Err(e @ DiaryError::DuplicateUsername(_)) => {
            tracing::warn!(username = %form.username, "Signup rejected: username taken");
            auth_page(
                jar,
                StatusCode::CONFLICT,
                "signup",
                &form.username,
                Some(FlashMessage::error(e.to_string())),
            )
        }
        Err(e) if e.is_validation() => auth_page(
            jar,
            StatusCode::UNPROCESSABLE_ENTITY,
            "signup",
            &form.username,
            Some(FlashMessage::error(e.to_string())),
        ),
        Err(e) => {
            tracing::error!("Signup failed: {}", e);
            let jar = flash::push(
                jar,
                FlashMessage::error(
                    "An error occurred while creating your account. Please try again.",
                ),
            );
            (jar, Redirect::to("/signup")).into_response()
        }
    }
}

/// GET /logout
///
/// Revokes the presented session token and clears the cookie. If the revocation cannot
/// be stored the cookie is kept and the request fails.
async fn logout_handler<S, U>(
    State(state): State<AppState<S, U>>,
    user: CurrentUser,
    jar: CookieJar,
) -> Response
where
    S: SqlStorage,
    U: UserStorage,
{
    if let Err(e) = revoke_session(&state, &user).await {
        tracing::error!(user_id = %user.id(), "Failed to record logout: {}", e);
        return e.into_response();
    }
    tracing::info!(user_id = %user.id(), "User logged out");

    (jar.remove(removal_cookie()), Redirect::to("/login")).into_response()
}
