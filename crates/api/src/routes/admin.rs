//! Admin route handlers: dashboard, user management and stock alerts.
//!
//! Every handler requires an admin bearer token.

use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use freshcart_core::{UserId, UserRole};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{DashboardStats, Page, PageRequest, Product, User};
use crate::response::ApiResponse;
use crate::routes::orders;
use crate::services::{AdminService, AuthService};
use crate::state::AppState;

/// Role change request body.
#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: String,
}

/// Admin routes, mounted at `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(show_user).put(update_user_role).delete(delete_user),
        )
        .route("/orders", get(orders::index))
        .route("/products/low-stock", get(low_stock))
}

/// Store-wide counts, revenue, low stock, recent orders and top sellers.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiResponse<DashboardStats>> {
    let stats = AdminService::new(state.pool(), state.config().low_stock_threshold)
        .dashboard_stats()
        .await?;
    Ok(ApiResponse::ok(stats))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<ApiResponse<Page<User>>> {
    let users = AuthService::new(state.pool(), &state.config().auth)
        .list_users(page)
        .await?;
    Ok(ApiResponse::ok(users))
}

#[instrument(skip(state, _admin))]
pub async fn show_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool(), &state.config().auth)
        .get_user(id)
        .await?;
    Ok(ApiResponse::ok(user))
}

/// Change a user's role. Demoting the last admin is refused.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleUpdate>,
) -> Result<ApiResponse<User>> {
    let role = body
        .role
        .parse::<UserRole>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let user = AuthService::new(state.pool(), &state.config().auth)
        .update_role(id, role)
        .await?;
    Ok(ApiResponse::ok(user).with_message("User role updated"))
}

/// Delete an account. Admins cannot delete themselves or the last admin.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<ApiResponse<Option<()>>> {
    AuthService::new(state.pool(), &state.config().auth)
        .delete_user(admin.id, id)
        .await?;
    Ok(ApiResponse::message("User deleted"))
}

#[instrument(skip_all)]
pub async fn low_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiResponse<Vec<Product>>> {
    let products = AdminService::new(state.pool(), state.config().low_stock_threshold)
        .low_stock_products()
        .await?;
    Ok(ApiResponse::ok(products))
}
