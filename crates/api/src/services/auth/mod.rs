//! Authentication and account service.
//!
//! Covers password registration and login, bearer-token issuance, the
//! password-reset token lifecycle, profile edits and admin user management.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use freshcart_core::{Email, UserId, UserRole};

use crate::config::AuthConfig;
use crate::db::RepositoryError;
use crate::db::users::{DeleteUserOutcome, RoleChangeOutcome, UserRepository};
use crate::models::{NewUser, Page, PageRequest, Pagination, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a password-reset token (hex-encoded to 64 characters).
const RESET_TOKEN_BYTES: usize = 32;

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A freshly issued password-reset token.
///
/// The plaintext exists only here; the database holds its SHA-256 digest.
pub struct IssuedResetToken {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for IssuedResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedResetToken")
            .field("user", &self.user.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    config: &'a AuthConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a AuthConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            config,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    pub async fn register(&self, input: Registration) -> Result<User, AuthError> {
        self.create_user(input, UserRole::User).await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn create_user(&self, input: Registration, role: UserRole) -> Result<User, AuthError> {
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;

        // Fast path; the unique index below is what actually guarantees it.
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create(&NewUser {
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                phone: non_blank(input.phone),
                address: non_blank(input.address),
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !compare_password(password, &password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Change a signed-in user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !compare_password(current, &hash) {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new)?;

        self.users
            .update_password(user_id, &hash_password(new)?)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Issue a password-reset token for the account with this email.
    ///
    /// Any earlier token for the account stops working.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    pub async fn generate_password_reset_token(
        &self,
        email: &str,
    ) -> Result<IssuedResetToken, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes);
        self.users
            .set_reset_token(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "password reset token issued");
        Ok(IssuedResetToken { user, token })
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// The token is checked before the password, so a dead link always
    /// reports `InvalidOrExpiredToken`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOrExpiredToken` if no unexpired token matches.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<UserId, AuthError> {
        let token_hash = hash_reset_token(token.trim());
        if !self.users.reset_token_is_live(&token_hash).await? {
            return Err(AuthError::InvalidOrExpiredToken);
        }
        validate_password(new_password)?;
        let new_hash = hash_password(new_password)?;

        // Redemption re-checks the token, so a concurrent reset still loses.
        let user_id = self
            .users
            .redeem_reset_token(&token_hash, &new_hash)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        tracing::info!(user_id = %user_id, "password reset completed");
        Ok(user_id)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name, phone and address.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a name is set to blank.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        mut update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        for (field, value) in [
            ("first name", &mut update.first_name),
            ("last name", &mut update.last_name),
        ] {
            if let Some(v) = value {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    return Err(AuthError::Validation(format!("{field} cannot be blank")));
                }
                *v = trimmed.to_string();
            }
        }

        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Admin user management
    // =========================================================================

    /// Number of admin accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn count_admins(&self) -> Result<i64, AuthError> {
        Ok(self.users.count_admins().await?)
    }

    /// List accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn list_users(&self, page: PageRequest) -> Result<Page<User>, AuthError> {
        let page = page.normalized();
        let (items, total) = self.users.list(page).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    /// Returns `AuthError::LastAdminProtected` if this would demote the only admin.
    pub async fn update_role(&self, target: UserId, role: UserRole) -> Result<User, AuthError> {
        match self.users.update_role_guarded(target, role).await? {
            RoleChangeOutcome::Changed(user) => {
                tracing::info!(user_id = %target, role = %role, "role changed");
                Ok(*user)
            }
            RoleChangeOutcome::NotFound => Err(AuthError::UserNotFound),
            RoleChangeOutcome::LastAdmin => Err(AuthError::LastAdminProtected),
        }
    }

    /// Delete an account on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CannotDeleteSelf` if `actor` is `target`.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    /// Returns `AuthError::LastAdminProtected` if the target is the only admin.
    pub async fn delete_user(&self, actor: UserId, target: UserId) -> Result<(), AuthError> {
        if actor == target {
            return Err(AuthError::CannotDeleteSelf);
        }
        self.delete_guarded(target).await
    }

    /// Delete an account unless it is the only admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    /// Returns `AuthError::LastAdminProtected` if the target is the only admin.
    pub async fn delete_guarded(&self, target: UserId) -> Result<(), AuthError> {
        match self.users.delete_guarded(target).await? {
            DeleteUserOutcome::Deleted => {
                tracing::info!(user_id = %target, "account deleted");
                Ok(())
            }
            DeleteUserOutcome::NotFound => Err(AuthError::UserNotFound),
            DeleteUserOutcome::LastAdmin => Err(AuthError::LastAdminProtected),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Check a password against a stored PHC hash. A malformed hash never matches.
#[must_use]
pub fn compare_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// A new random reset token, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 digest of a reset token, hex-encoded. Only this is stored.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
