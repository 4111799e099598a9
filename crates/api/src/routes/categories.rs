//! Category route handlers.

use axum::{Router, extract::State, routing::get};
use tracing::instrument;

use freshcart_core::CategoryId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAdmin;
use crate::models::{Category, NewCategory};
use crate::response::ApiResponse;
use crate::services::CatalogService;
use crate::state::AppState;

/// Category routes, mounted at `/api/categories`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// All categories with their product counts.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<ApiResponse<Vec<Category>>> {
    let categories = CatalogService::new(state.pool()).list_categories().await?;
    Ok(ApiResponse::ok(categories))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<ApiResponse<Category>> {
    let category = CatalogService::new(state.pool()).get_category(id).await?;
    Ok(ApiResponse::ok(category))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(body): ApiJson<NewCategory>,
) -> Result<ApiResponse<Category>> {
    let category = CatalogService::new(state.pool())
        .create_category(body)
        .await?;
    Ok(ApiResponse::created(category).with_message("Category created"))
}

#[instrument(skip(state, _admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(body): ApiJson<NewCategory>,
) -> Result<ApiResponse<Category>> {
    let category = CatalogService::new(state.pool())
        .update_category(id, body)
        .await?;
    Ok(ApiResponse::ok(category).with_message("Category updated"))
}

/// Delete a category. Refused while any product still references it.
#[instrument(skip(state, _admin))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<ApiResponse<Option<()>>> {
    CatalogService::new(state.pool()).delete_category(id).await?;
    Ok(ApiResponse::message("Category deleted"))
}
