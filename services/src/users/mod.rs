//! User accounts and sessions.
//!
//! - `storage`: credential persistence behind the `UserStorage` trait
//! - `password` / `credentials`: Argon2 hashing, registration and login checks
//! - `session` / `session_auth`: JWT session cookie and the `CurrentUser` extractor
//! - `revocation_cache`: tokens invalidated by logout
//! - `routes`: `/login`, `/signup` and `/logout`

pub mod credentials;
pub mod password;
pub mod revocation_cache;
pub mod routes;
pub mod session;
pub mod session_auth;
pub mod storage;

pub use routes::{AppState, AuthPage, CredentialsForm, auth_routes};
pub use session_auth::{AuthRedirect, CurrentUser, MaybeUser};
pub use storage::{MockUserStorage, PgUserStorage, StoredUser, UserStorage, UserStorageError};
