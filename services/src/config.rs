use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use tracing::info;

/// Fallback signing secret for environments that do not hold real user data.
const DEV_JWT_SECRET: &str = "default-jwt-secret-for-local-development-only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "prod")]
    Prod,
    #[serde(rename = "test")]
    Test,
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Prod => write!(f, "prod"),
            Self::Test => write!(f, "test"),
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // HS256 secret for session tokens
    jwt_secret: String,
}

// Raw environment variables before defaults are applied.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    jwt_secret: Option<String>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Available to unit and integration tests; never used by the binary.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/diary_test".to_owned(),
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_owned(),
        }
    }

    #[cfg(test)]
    pub fn new_for_test_with_env(env: Env) -> Self {
        Self {
            env,
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    /// Get the JWT secret for signing session tokens.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Session cookies carry the `Secure` attribute everywhere except local development.
    pub fn secure_cookies(&self) -> bool {
        !self.is_local()
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    Env::Prod | Env::Test => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("PORT not set, defaulting to 8080 for {} environment", env);
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        let jwt_secret = match jwt_secret {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                DEV_JWT_SECRET.to_owned()
            }
            _ => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        Ok(Self {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_env::from_iter;

    #[test]
    fn local_defaults_apply_without_optional_vars() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "local"),
            ("DATABASE_URL", "postgres://example"),
        ])
        .expect("RawConfig should deserialize");

        let config = Config::from_raw(raw).expect("local config should build");
        assert_eq!(config.server_addr(), "127.0.0.1");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.jwt_secret(), DEV_JWT_SECRET);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn prod_requires_port() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "prod"),
            ("DATABASE_URL", "postgres://example"),
            ("JWT_SECRET", "prod-secret"),
        ])
        .expect("RawConfig should deserialize");

        let result = Config::from_raw(raw);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("PORT"));
    }

    #[test]
    fn prod_requires_jwt_secret() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "prod"),
            ("DATABASE_URL", "postgres://example"),
            ("PORT", "9000"),
        ])
        .expect("RawConfig should deserialize");

        let result = Config::from_raw(raw);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn prod_config_is_public_and_secure() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "prod"),
            ("DATABASE_URL", "postgres://example"),
            ("PORT", "9000"),
            ("JWT_SECRET", "prod-secret"),
        ])
        .expect("RawConfig should deserialize");

        let config = Config::from_raw(raw).expect("prod config should build");
        assert_eq!(config.server_addr(), "0.0.0.0");
        assert_eq!(config.port(), 9000);
        assert_eq!(*config.environment(), Env::Prod);
        assert!(config.secure_cookies());
    }

    #[test]
    fn env_display_matches_serde_names() {
        assert_eq!(Env::Local.to_string(), "local");
        assert_eq!(Env::Prod.to_string(), "prod");
        assert_eq!(Env::Test.to_string(), "test");
        assert!(!Config::new_for_test_with_env(Env::Test).is_local());
    }
}
