//! Authentication route handlers.
//!
//! Registration and login hand back a signed bearer token together with the
//! user summary. The password-reset endpoints implement the token lifecycle:
//! `forgot-password` issues a single-use token and mails a link,
//! `reset-password/{token}` redeems it.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{RequireAuth, auth_rate_limiter};
use crate::models::User;
use crate::response::ApiResponse;
use crate::services::auth::Registration;
use crate::services::{AuthError, AuthService, PasswordResetMessage};
use crate::state::AppState;

/// Sent for every forgot-password request, whether or not the account exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Forgot-password request body.
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request body.
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Change-password request body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// A signed bearer token and the user it was issued for.
#[derive(Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Auth routes, mounted at `/api/auth`.
///
/// The credential endpoints share one per-IP limiter when `rate_limit` is set.
pub fn router(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password));
    let credentials = if rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    Router::new()
        .merge(credentials)
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

fn issue(state: &AppState, user: User) -> Result<AuthPayload> {
    let token = state.jwt().issue(&user)?;
    Ok(AuthPayload { token, user })
}

/// Create a customer account.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Registration>,
) -> Result<ApiResponse<AuthPayload>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .register(body)
        .await?;
    tracing::info!(user_id = %user.id, "account registered");
    Ok(ApiResponse::created(issue(&state, user)?).with_message("Registration successful"))
}

/// Exchange email and password for a bearer token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiResponse<AuthPayload>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .login(&body.email, &body.password)
        .await?;
    Ok(ApiResponse::ok(issue(&state, user)?).with_message("Login successful"))
}

/// The caller's own account.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .get_user(user.id)
        .await?;
    Ok(ApiResponse::ok(user))
}

/// Change the caller's password after checking the current one.
///
/// Also mounted at `PUT /api/users/change-password`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Option<()>>> {
    AuthService::new(state.pool(), &state.config().auth)
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::message("Password updated successfully"))
}

/// Issue a password-reset token and mail the link.
///
/// The response never reveals whether the email belongs to an account.
/// Delivery failures are logged, not reported to the caller.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<Option<()>>> {
    let config = state.config();
    let issued = match AuthService::new(state.pool(), &config.auth)
        .generate_password_reset_token(&body.email)
        .await
    {
        Ok(issued) => issued,
        Err(AuthError::UserNotFound | AuthError::InvalidEmail(_)) => {
            tracing::debug!("password reset requested for unknown email");
            return Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE));
        }
        Err(e) => return Err(e.into()),
    };

    let message = PasswordResetMessage {
        name: issued.user.first_name.clone(),
        reset_url: config.reset_password_url(&issued.token),
        ttl_minutes: config.auth.reset_token_ttl_minutes,
    };
    if let Err(e) = state
        .notifier()
        .send_password_reset(&issued.user.email, &message)
        .await
    {
        tracing::error!(user_id = %issued.user.id, error = %e, "failed to send password reset email");
    }

    Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE))
}

/// Redeem a password-reset token.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<ApiResponse<Option<()>>> {
    AuthService::new(state.pool(), &state.config().auth)
        .reset_password(&token, &body.password)
        .await?;
    Ok(ApiResponse::message("Password has been reset successfully"))
}
