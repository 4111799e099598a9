//! User repository for database operations.
//!
//! Password hashes and reset-token hashes are read and written here and never
//! leave this module except as the plain `String` a verifier needs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use freshcart_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::{NewUser, PageRequest, ProfileUpdate, User};

// =============================================================================
// Internal Row Types
// =============================================================================

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, address, role, created_at, updated_at";

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    address: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for credential lookups.
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Result of a guarded account deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteUserOutcome {
    Deleted,
    NotFound,
    /// The target is the only remaining admin.
    LastAdmin,
}

/// Result of a guarded role change.
#[derive(Debug, Clone)]
pub enum RoleChangeOutcome {
    Changed(Box<User>),
    NotFound,
    /// The change would demote the only remaining admin.
    LastAdmin,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user together with their password hash, by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.password_hash)))
            .transpose()
    }

    /// Get a user's password hash by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hash.map(|(h,)| h))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, address, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "email"))?;

        row.try_into()
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                phone      = COALESCE($4, phone),
                address    = COALESCE($5, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(&update.address)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace a user's password hash.
    ///
    /// Any outstanding reset token is cleared at the same time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Password reset tokens
    // =========================================================================

    /// Store a reset-token hash and its absolute expiry, replacing any previous token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET reset_password_token = $2,
                reset_password_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Whether an unexpired reset token with this digest exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_token_is_live(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        let (live,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE reset_password_token = $1
                  AND reset_password_expires_at > NOW()
            )
            ",
        )
        .bind(token_hash)
        .fetch_one(self.pool)
        .await?;
        Ok(live)
    }

    /// Redeem a reset token: set the new password hash and clear both token
    /// columns, in one statement, for the user whose unexpired token matches.
    ///
    /// Returns `None` (and changes nothing) if no unexpired token matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let id: Option<(UserId,)> = sqlx::query_as(
            r"
            UPDATE users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires_at = NULL,
                updated_at = NOW()
            WHERE reset_password_token = $1
              AND reset_password_expires_at > NOW()
            RETURNING id
            ",
        )
        .bind(token_hash)
        .bind(new_password_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(|(id,)| id))
    }

    // =========================================================================
    // Admin management
    // =========================================================================

    /// Count users with the `admin` role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_admins(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<User>, _>>()?;
        Ok((users, self.count().await?))
    }

    /// Delete a user unless they are the last admin.
    ///
    /// The admin rows are locked for the duration of the check so two
    /// concurrent deletions cannot both observe "two admins left".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete_guarded(&self, id: UserId) -> Result<DeleteUserOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let admins: Vec<(UserId,)> =
            sqlx::query_as("SELECT id FROM users WHERE role = 'admin' FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;

        let role: Option<(UserRole,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((role,)) = role else {
            return Ok(DeleteUserOutcome::NotFound);
        };

        if role.is_admin() && admins.len() <= 1 {
            return Ok(DeleteUserOutcome::LastAdmin);
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteUserOutcome::Deleted)
    }

    /// Change a user's role unless it would demote the last admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_role_guarded(
        &self,
        id: UserId,
        role: UserRole,
    ) -> Result<RoleChangeOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let admins: Vec<(UserId,)> =
            sqlx::query_as("SELECT id FROM users WHERE role = 'admin' FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;

        let current: Option<(UserRole,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((current,)) = current else {
            return Ok(RoleChangeOutcome::NotFound);
        };

        if current.is_admin() && !role.is_admin() && admins.len() <= 1 {
            return Ok(RoleChangeOutcome::LastAdmin);
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RoleChangeOutcome::Changed(Box::new(row.try_into()?)))
    }
}
