use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Base URL of the client-facing app; onboarding links point here.
    pub public_base_url: String,
    /// Root directory for secured client files and legacy public uploads.
    pub storage_root: PathBuf,
    /// Lifetime of an onboarding link in days (default: `30`).
    pub onboarding_token_ttl_days: i64,
    /// Secret from which the SMTP password sealing key is derived.
    pub credentials_key: String,
    /// Body size limit for multipart uploads (default: 25 MiB).
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `PUBLIC_BASE_URL`           | `http://localhost:5173`    |
    /// | `STORAGE_ROOT`              | `storage`                  |
    /// | `ONBOARDING_TOKEN_TTL_DAYS` | `30`                       |
    /// | `CREDENTIALS_KEY`           | **required**               |
    /// | `MAX_UPLOAD_BYTES`          | `26214400`                 |
    ///
    /// See [`JwtConfig::from_env`] for the JWT variables.
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or a missing `CREDENTIALS_KEY`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let storage_root =
            PathBuf::from(std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".into()));

        let onboarding_token_ttl_days: i64 = std::env::var("ONBOARDING_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("ONBOARDING_TOKEN_TTL_DAYS must be a valid i64");
        assert!(
            onboarding_token_ttl_days > 0,
            "ONBOARDING_TOKEN_TTL_DAYS must be positive"
        );

        let credentials_key = std::env::var("CREDENTIALS_KEY")
            .expect("CREDENTIALS_KEY must be set in the environment");
        assert!(!credentials_key.is_empty(), "CREDENTIALS_KEY must not be empty");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "26214400".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            public_base_url,
            storage_root,
            onboarding_token_ttl_days,
            credentials_key,
            max_upload_bytes,
        }
    }
}
