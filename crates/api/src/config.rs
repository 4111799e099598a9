//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FRESHCART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FRESHCART_JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `FRESHCART_HOST` - Bind address (default: 127.0.0.1)
//! - `FRESHCART_PORT` - Listen port (default: 5000)
//! - `FRESHCART_ENV` - `development` or `production` (default: production)
//! - `FRESHCART_FRONTEND_URL` - Base URL used in password-reset links (default: <http://localhost:3000>)
//! - `FRESHCART_CORS_ORIGIN` - Allowed browser origin (default: the frontend URL)
//! - `FRESHCART_JWT_EXPIRY_HOURS` - Bearer token lifetime (default: 24)
//! - `FRESHCART_RESET_TOKEN_TTL_MINUTES` - Password-reset token lifetime (default: 60)
//! - `FRESHCART_LOW_STOCK_THRESHOLD` - Dashboard low-stock cutoff (default: 10)
//! - `FRESHCART_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `FRESHCART_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `FRESHCART_DB_STATEMENT_TIMEOUT_SECS` - Per-statement timeout (default: 30)
//! - `FRESHCART_RATE_LIMIT` - Rate limit the auth endpoints (default: true)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   Outbound email; all-or-nothing, reset emails are only logged when unset
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Incomplete SMTP configuration: {0} is set but {1} is missing")]
    IncompleteSmtp(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Whether internal error details may be shown to clients.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Frontend base URL for links in emails
    pub frontend_url: String,
    /// Allowed CORS origin
    pub cors_origin: String,
    /// Database pool settings
    pub database: DatabaseConfig,
    /// Bearer token and reset token settings
    pub auth: AuthConfig,
    /// SMTP settings; `None` logs reset emails instead of sending them
    pub email: Option<EmailConfig>,
    /// Products below this stock level are reported on the admin dashboard
    pub low_stock_threshold: i32,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Database pool configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub url: SecretString,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Server-side statement timeout applied to every connection
    pub statement_timeout: Duration,
}

/// Token settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: SecretString,
    /// Bearer token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Password-reset token lifetime in minutes
    pub reset_token_ttl_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("reset_token_ttl_minutes", &self.reset_token_ttl_minutes)
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("FRESHCART_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("FRESHCART_PORT", "5000")?;
        let environment = parse_env_or_default::<Environment>("FRESHCART_ENV", "production")?;
        let frontend_url = get_env_or_default("FRESHCART_FRONTEND_URL", "http://localhost:3000");
        url::Url::parse(&frontend_url).map_err(|e| {
            ConfigError::InvalidEnvVar("FRESHCART_FRONTEND_URL".to_string(), e.to_string())
        })?;
        let cors_origin =
            get_optional_env("FRESHCART_CORS_ORIGIN").unwrap_or_else(|| frontend_url.clone());

        Ok(Self {
            host,
            port,
            environment,
            frontend_url,
            cors_origin,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            email: EmailConfig::from_env()?,
            low_stock_threshold: parse_env_or_default("FRESHCART_LOW_STOCK_THRESHOLD", "10")?,
            rate_limit: parse_env_or_default("FRESHCART_RATE_LIMIT", "true")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Link sent to a user to redeem a password-reset token.
    #[must_use]
    pub fn reset_password_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password/{token}",
            self.frontend_url.trim_end_matches('/')
        )
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_database_url("FRESHCART_DATABASE_URL")?,
            max_connections: parse_env_or_default("FRESHCART_DB_MAX_CONNECTIONS", "10")?,
            acquire_timeout: Duration::from_secs(parse_env_or_default(
                "FRESHCART_DB_ACQUIRE_TIMEOUT_SECS",
                "10",
            )?),
            statement_timeout: Duration::from_secs(parse_env_or_default(
                "FRESHCART_DB_STATEMENT_TIMEOUT_SECS",
                "30",
            )?),
        })
    }
}

/// Longest bearer token lifetime accepted: one year.
const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365;
/// Longest reset link lifetime accepted: one day.
const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Require `1 <= value <= max`.
fn bounded(var: &str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            var.to_string(),
            format!("must be between 1 and {max}"),
        ))
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("FRESHCART_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "FRESHCART_JWT_SECRET")?;

        let jwt_expiry_hours = bounded(
            "FRESHCART_JWT_EXPIRY_HOURS",
            parse_env_or_default("FRESHCART_JWT_EXPIRY_HOURS", "24")?,
            MAX_JWT_EXPIRY_HOURS,
        )?;
        let reset_token_ttl_minutes = bounded(
            "FRESHCART_RESET_TOKEN_TTL_MINUTES",
            parse_env_or_default("FRESHCART_RESET_TOKEN_TTL_MINUTES", "60")?,
            MAX_RESET_TOKEN_TTL_MINUTES,
        )?;

        Ok(Self {
            jwt_secret,
            jwt_expiry_hours,
            reset_token_ttl_minutes,
        })
    }
}

impl EmailConfig {
    const KEYS: [&'static str; 4] = ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "SMTP_FROM"];

    fn from_env() -> Result<Option<Self>, ConfigError> {
        let present: Vec<&str> = Self::KEYS
            .into_iter()
            .filter(|key| get_optional_env(key).is_some())
            .collect();

        if present.is_empty() {
            return Ok(None);
        }
        if let Some(missing) = Self::KEYS.into_iter().find(|key| !present.contains(key)) {
            let first = present.first().copied().unwrap_or("SMTP_HOST");
            return Err(ConfigError::IncompleteSmtp(
                first.to_string(),
                missing.to_string(),
            ));
        }

        Ok(Some(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to the generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
