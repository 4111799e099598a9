//! Admin account management commands.
//!
//! The HTTP API never lets a client grant itself the admin role, so the
//! first admin of a fresh database is created here.

use secrecy::{ExposeSecret, SecretString};

use freshcart_api::db::UserRepository;
use freshcart_api::models::NewUser;
use freshcart_api::services::auth::{hash_password, validate_password};
use freshcart_core::{Email, UserRole};

use super::{CliError, connect};

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, the email is
/// already registered, or the database is unreachable.
pub async fn create_user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;
    let password = password
        .or_else(|| std::env::var("FRESHCART_ADMIN_PASSWORD").ok())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar("FRESHCART_ADMIN_PASSWORD"))?;
    validate_password(password.expose_secret())?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);
    if users.get_by_email(&email).await?.is_some() {
        return Err(CliError::Invalid(format!(
            "an account already exists for {email}; use `admin promote` instead"
        )));
    }

    let user = users
        .create(&NewUser {
            email,
            password_hash: hash_password(password.expose_secret())?,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            phone: None,
            address: None,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    pool.close().await;
    Ok(())
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns an error if no account matches the email.
pub async fn promote(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CliError::Invalid(format!("no account for {email}")))?;

    if user.role == UserRole::Admin {
        tracing::info!("{} is already an admin", user.email);
    } else {
        users.update_role_guarded(user.id, UserRole::Admin).await?;
        tracing::info!("{} is now an admin", user.email);
    }
    pool.close().await;
    Ok(())
}
