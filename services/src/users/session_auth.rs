//! Session cookie authentication for gated routes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use diary_services::users::session_auth::CurrentUser;
//!
//! async fn protected_handler(user: CurrentUser) -> impl IntoResponse {
//!     format!("Hello, {}!", user.username())
//! }
//! ```
//!
//! A request is authenticated when its `diary_session` cookie holds a token that:
//! - is signed with the server's `JWT_SECRET`
//! - has the `Diary` issuer and an unexpired `exp`
//! - has not been revoked by a logout
//!
//! Anything else rejects with `303 See Other` to `/login`.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use uuid::Uuid;

use super::routes::AppState;
use super::session::{SESSION_COOKIE, token_hash, validate_session_token};
use super::storage::{UserStorage, UserStorageError};
use crate::config::Config;
use crate::database::SqlStorage;
use crate::error::DiaryError;

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user_id: Uuid,
    username: String,
    token_hash: String,
    expires_at: i64,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Hash of the session token, used to revoke it on logout.
    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    /// When the session token stops being accepted on its own.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Rejection for unauthenticated requests: redirect to the login page.
#[derive(Debug)]
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

/// Cache first, then storage. A storage hit is copied back into the cache.
async fn is_revoked<S, U>(state: &AppState<S, U>, hash: &str) -> bool
where
    U: UserStorage,
{
    if state.revocations.is_revoked(hash) {
        return true;
    }

    match state.user_storage.is_session_revoked(hash).await {
        Ok(true) => {
            state.revocations.revoke(hash);
            true
        }
        Ok(false) => false,
        Err(e) => {
            let e: UserStorageError = e.into();
            // Fail closed: an unverifiable session is treated as logged out.
            tracing::error!("Failed to check session revocation: {}", e);
            true
        }
    }
}

async fn authenticate_parts<S, U>(parts: &Parts, state: &AppState<S, U>) -> Option<CurrentUser>
where
    U: UserStorage,
{
    let Some(config) = parts.extensions.get::<Config>() else {
        tracing::error!("Config extension missing; cannot validate sessions");
        return None;
    };

    let token = CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)?
        .value()
        .to_owned();
    if token.is_empty() {
        return None;
    }

    let claims = match validate_session_token(&token, config.jwt_secret()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            return None;
        }
    };

    let hash = token_hash(&token);
    if is_revoked(state, &hash).await {
        tracing::warn!(user_id = %claims.sub, "Revoked session token presented");
        return None;
    }

    Some(CurrentUser {
        user_id: claims.sub,
        username: claims.username,
        token_hash: hash,
        expires_at: claims.exp,
    })
}

/// Log a session out: the token hash goes into the cache and into storage, where it
/// outlives cache eviction and restarts.
pub async fn revoke_session<S, U>(
    state: &AppState<S, U>,
    user: &CurrentUser,
) -> Result<(), DiaryError>
where
    U: UserStorage,
{
    state.revocations.revoke(user.token_hash());
    state
        .user_storage
        .revoke_session(user.token_hash(), user.expires_at())
        .await
        .map_err(|e| {
            let e: UserStorageError = e.into();
            DiaryError::from(e)
        })
}

impl<S, U> FromRequestParts<AppState<S, U>> for CurrentUser
where
    S: SqlStorage,
    U: UserStorage,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, U>,
    ) -> Result<Self, Self::Rejection> {
        authenticate_parts(parts, state).await.ok_or(AuthRedirect)
    }
}

/// Like [`CurrentUser`] but never rejects; for pages that serve both audiences.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S, U> FromRequestParts<AppState<S, U>> for MaybeUser
where
    S: SqlStorage,
    U: UserStorage,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, U>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate_parts(parts, state).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockSqlStorage;
    use crate::users::revocation_cache::RevocationCache;
    use crate::users::session::generate_session_token;
    use crate::users::storage::MockUserStorage;
    use axum::http::{Request, StatusCode, header};

    fn state() -> AppState<MockSqlStorage, MockUserStorage> {
        AppState::new(MockSqlStorage::new(), MockUserStorage::new())
    }

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        parts.extensions.insert(Config::new_for_test());
        parts
    }

    #[tokio::test]
    async fn valid_cookie_yields_current_user() {
        let config = Config::new_for_test();
        let id = Uuid::new_v4();
        let token = generate_session_token(id, "alice", config.jwt_secret()).unwrap();
        let mut parts = parts_with_cookie(Some(&format!("{SESSION_COOKIE}={token}")));

        let user = CurrentUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap();

        assert_eq!(user.id(), id);
        assert_eq!(user.username(), "alice");
        assert_eq!(user.token_hash(), token_hash(&token));
    }

    #[tokio::test]
    async fn missing_cookie_redirects_to_login() {
        let mut parts = parts_with_cookie(None);

        let rejection = CurrentUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap_err();
        let response = rejection.into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn garbage_cookie_is_rejected() {
        let mut parts = parts_with_cookie(Some(&format!("{SESSION_COOKIE}=not-a-jwt")));
        assert!(
            CurrentUser::from_request_parts(&mut parts, &state())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let config = Config::new_for_test();
        let token = generate_session_token(Uuid::new_v4(), "alice", config.jwt_secret()).unwrap();
        let state = state();
        state.revocations.revoke(token_hash(&token));

        let mut parts = parts_with_cookie(Some(&format!("{SESSION_COOKIE}={token}")));
        assert!(
            CurrentUser::from_request_parts(&mut parts, &state)
                .await
                .is_err()
        );
    }

    fn sign_in(name: &str) -> String {
        let config = Config::new_for_test();
        generate_session_token(Uuid::new_v4(), name, config.jwt_secret()).unwrap()
    }

    async fn extract(
        state: &AppState<MockSqlStorage, MockUserStorage>,
        token: &str,
    ) -> Option<CurrentUser> {
        let mut parts = parts_with_cookie(Some(&format!("{SESSION_COOKIE}={token}")));
        CurrentUser::from_request_parts(&mut parts, state).await.ok()
    }

    #[tokio::test]
    async fn logged_out_token_stays_rejected_after_cache_eviction() {
        let state = AppState {
            sql_storage: MockSqlStorage::new(),
            user_storage: MockUserStorage::new(),
            revocations: RevocationCache::new(100),
        };

        let token = sign_in("alice");
        let alice = extract(&state, &token).await.unwrap();
        revoke_session(&state, &alice).await.unwrap();

        // Far more logouts than the cache can hold.
        for i in 0..500 {
            let other = sign_in(&format!("user{i}"));
            let user = extract(&state, &other).await.unwrap();
            revoke_session(&state, &user).await.unwrap();
        }

        assert!(extract(&state, &token).await.is_none());
        assert_eq!(state.user_storage.revoked_session_count(), 501);
    }

    #[tokio::test]
    async fn revocation_survives_a_fresh_cache() {
        let before = state();
        let token = sign_in("alice");
        let alice = extract(&before, &token).await.unwrap();
        revoke_session(&before, &alice).await.unwrap();

        // Same storage, new process-local cache.
        let after = AppState::new(MockSqlStorage::new(), before.user_storage.clone());
        assert!(!after.revocations.is_revoked(&token_hash(&token)));
        assert!(extract(&after, &token).await.is_none());
        assert!(after.revocations.is_revoked(&token_hash(&token)));
    }

    #[tokio::test]
    async fn failed_revocation_write_is_reported() {
        let state = AppState::new(MockSqlStorage::new(), MockUserStorage::failing_writes());
        let token = sign_in("alice");
        let alice = extract(&state, &token).await.unwrap();

        assert!(matches!(
            revoke_session(&state, &alice).await,
            Err(DiaryError::DatabaseCommitFailure(_))
        ));
        // The cache still turns the token away in this process.
        assert!(extract(&state, &token).await.is_none());
    }

    #[tokio::test]
    async fn expiry_comes_from_the_token() {
        let state = state();
        let token = sign_in("alice");
        let alice = extract(&state, &token).await.unwrap();

        let remaining = alice.expires_at() - Utc::now();
        assert!(remaining > chrono::Duration::days(6));
        assert!(remaining <= chrono::Duration::days(7));
    }

    #[tokio::test]
    async fn maybe_user_is_none_when_anonymous() {
        let mut parts = parts_with_cookie(None);
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
