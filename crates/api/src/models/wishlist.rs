//! Wishlist entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use freshcart_core::{ProductId, WishlistItemId};

/// A saved product with enough catalog data to render a card.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: i32,
    pub added_at: DateTime<Utc>,
}
