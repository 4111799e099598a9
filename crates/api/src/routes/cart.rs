//! Cart route handlers.
//!
//! Every endpoint answers with the full recomputed cart.

use axum::{
    Router,
    extract::State,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use freshcart_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::response::ApiResponse;
use crate::services::CartService;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Cart routes, mounted at `/api/cart`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/item/{id}", put(update).delete(remove))
        .route("/clear", delete(clear))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartView>> {
    let cart = CartService::new(state.pool()).get_cart(user.id).await?;
    Ok(ApiResponse::ok(cart))
}

/// Add a product, merging with an existing line for the same product.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<ApiResponse<CartView>> {
    let cart = CartService::new(state.pool())
        .add_item(user.id, body.product_id, body.quantity)
        .await?;
    Ok(ApiResponse::ok(cart).with_message("Item added to cart"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<UpdateQuantityRequest>,
) -> Result<ApiResponse<CartView>> {
    let cart = CartService::new(state.pool())
        .update_item_quantity(user.id, id, body.quantity)
        .await?;
    Ok(ApiResponse::ok(cart).with_message("Cart updated"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<ApiResponse<CartView>> {
    let cart = CartService::new(state.pool())
        .remove_item(user.id, id)
        .await?;
    Ok(ApiResponse::ok(cart).with_message("Item removed from cart"))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartView>> {
    let cart = CartService::new(state.pool()).clear(user.id).await?;
    Ok(ApiResponse::ok(cart).with_message("Cart cleared"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_defaults_quantity() {
        let body: AddItemRequest = serde_json::from_str(r#"{"productId": 4}"#).unwrap();
        assert_eq!(body.product_id, ProductId::new(4));
        assert_eq!(body.quantity, 1);
    }
}
