//! Profile and wishlist route handlers for the signed-in user.

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use tracing::instrument;

use freshcart_core::ProductId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::{ProfileUpdate, User, WishlistEntry};
use crate::response::ApiResponse;
use crate::routes::auth::change_password;
use crate::services::{AuthService, WishlistService};
use crate::state::AppState;

/// User routes, mounted at `/api/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route("/wishlist", get(wishlist))
        .route(
            "/wishlist/{product_id}",
            post(add_to_wishlist).delete(remove_from_wishlist),
        )
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .get_user(user.id)
        .await?;
    Ok(ApiResponse::ok(user))
}

/// Update name, phone and address. Omitted fields keep their value.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .update_profile(user.id, body)
        .await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<WishlistEntry>>> {
    let entries = WishlistService::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(entries))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<ApiResponse<Vec<WishlistEntry>>> {
    let entries = WishlistService::new(state.pool())
        .add(user.id, product_id)
        .await?;
    Ok(ApiResponse::ok(entries).with_message("Added to wishlist"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<ApiResponse<Vec<WishlistEntry>>> {
    let entries = WishlistService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(ApiResponse::ok(entries).with_message("Removed from wishlist"))
}
