//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::JwtKeys;
use crate::services::{LogNotifier, Notifier, SmtpNotifier};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    jwt: JwtKeys,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Uses SMTP delivery when email is configured and logging otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let notifier: Arc<dyn Notifier> = match &config.email {
            Some(email) => Arc::new(SmtpNotifier::new(email)?),
            None => {
                tracing::warn!("SMTP not configured; password reset emails will only be logged");
                Arc::new(LogNotifier)
            }
        };
        Ok(Self::with_notifier(config, pool, notifier))
    }

    /// Create application state with an explicit notifier.
    #[must_use]
    pub fn with_notifier(config: ApiConfig, pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        let jwt = JwtKeys::new(&config.auth);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                notifier,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Bearer-token keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Outbound notification channel.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }
}
