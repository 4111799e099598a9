//! Product route handlers.

use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use freshcart_core::ProductId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Page, Product, ProductFilter, ProductPatch};
use crate::response::ApiResponse;
use crate::services::CatalogService;
use crate::state::AppState;

/// Featured products returned when no limit is given.
const DEFAULT_FEATURED: i64 = 8;

/// Query parameters for the featured listing.
#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<i64>,
}

/// Product routes, mounted at `/api/products`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/featured", get(featured))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Filtered, sorted and paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<ApiResponse<Page<Product>>> {
    let page = CatalogService::new(state.pool())
        .list_products(&filter)
        .await?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state))]
pub async fn featured(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeaturedQuery>,
) -> Result<ApiResponse<Vec<Product>>> {
    let products = CatalogService::new(state.pool())
        .featured_products(query.limit.unwrap_or(DEFAULT_FEATURED))
        .await?;
    Ok(ApiResponse::ok(products))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<Product>> {
    let product = CatalogService::new(state.pool()).get_product(id).await?;
    Ok(ApiResponse::ok(product))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(body): ApiJson<NewProduct>,
) -> Result<ApiResponse<Product>> {
    let product = CatalogService::new(state.pool()).create_product(body).await?;
    Ok(ApiResponse::created(product).with_message("Product created"))
}

#[instrument(skip(state, _admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ProductPatch>,
) -> Result<ApiResponse<Product>> {
    let product = CatalogService::new(state.pool())
        .update_product(id, body)
        .await?;
    Ok(ApiResponse::ok(product).with_message("Product updated"))
}

#[instrument(skip(state, _admin))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<Option<()>>> {
    CatalogService::new(state.pool()).delete_product(id).await?;
    Ok(ApiResponse::message("Product deleted"))
}
