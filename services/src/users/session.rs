//! Session tokens.
//!
//! A successful login issues an HS256 JWT carried in the `diary_session` cookie. Logout
//! revokes the token by its SHA-256 hash, see [`super::revocation_cache`].

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// The issuer name embedded in every session token.
pub const ISSUER: &str = "Diary";

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "diary_session";

/// Session lifetime: 7 days.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub username: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    pub iss: String,
    /// Unique token id, so two logins in the same second never share a revocation key.
    pub jti: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to create session token: {0}")]
    Encode(String),
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Issue a signed session token for a user.
pub fn generate_session_token(
    user_id: Uuid,
    username: &str,
    jwt_secret: &str,
) -> Result<String, SessionError> {
    let now = now_secs();
    let claims = SessionClaims {
        sub: user_id,
        username: username.to_owned(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
        iss: ISSUER.to_owned(),
        jti: Uuid::new_v4(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| SessionError::Encode(e.to_string()))
}

/// Verify signature, issuer and expiry of a session token.
pub fn validate_session_token(
    token: &str,
    jwt_secret: &str,
) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
        _ => SessionError::Invalid(e.to_string()),
    })
}

/// Hex SHA-256 of a token, the key under which it is revoked.
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie used to clear the session on logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
