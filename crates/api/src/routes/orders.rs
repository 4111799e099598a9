//! Order route handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use freshcart_core::OrderId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, Page, PageRequest};
use crate::response::ApiResponse;
use crate::services::OrderService;
use crate::services::orders::{CreateOrder, StatusUpdate};
use crate::state::AppState;

/// Query parameters for the admin order listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl OrderListQuery {
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// Order routes, mounted at `/api/orders`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/my-orders", get(mine))
        .route("/{id}", get(show))
        .route("/{id}/cancel", put(cancel))
        .route("/{id}/status", put(update_status))
}

/// Place an order from the request lines, or from the cart when none are given.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CreateOrder>,
) -> Result<ApiResponse<Order>> {
    let order = OrderService::new(state.pool())
        .create_order(user.id, body)
        .await?;
    Ok(ApiResponse::created(order).with_message("Order placed successfully"))
}

/// The caller's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Order>>> {
    let orders = OrderService::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// One order. Customers only see their own; admins see any.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<Order>> {
    let service = OrderService::new(state.pool());
    let order = if user.is_admin() {
        service.get(id).await?
    } else {
        service.get_for_user(id, user.id).await?
    };
    Ok(ApiResponse::ok(order))
}

/// Cancel one of the caller's orders and restore its stock.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<Order>> {
    let order = OrderService::new(state.pool())
        .cancel_order(id, user.id)
        .await?;
    Ok(ApiResponse::ok(order).with_message("Order cancelled"))
}

/// All orders, optionally filtered by status.
///
/// Also mounted at `GET /api/admin/orders`.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>> {
    let page = OrderService::new(state.pool())
        .list_all(query.page_request(), query.status.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Set an order's status and, optionally, its payment status.
#[instrument(skip(state, _admin))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<ApiResponse<Order>> {
    let order = OrderService::new(state.pool())
        .update_status(id, &body)
        .await?;
    Ok(ApiResponse::ok(order).with_message("Order status updated"))
}
