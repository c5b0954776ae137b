//! Version information populated at build time.
//!
//! Display format:
//! - Prod: `stable:{version}`
//! - Local/Test: `main:{commit}`

use crate::config::Env;

pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Version string advertised in the `x-service-version` header.
pub fn service_version(env: Env) -> String {
    match env {
        Env::Prod => format!("stable:{}", build_version()),
        Env::Local | Env::Test => format!("main:{BUILD_COMMIT}"),
    }
}
