//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_core::{Email, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};

/// A placed order with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Customer email, present on admin listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<Email>,
    /// Fixed at creation from the frozen line prices.
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A frozen order line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

/// A requested order line.
///
/// `price` is accepted for compatibility with older clients but never used:
/// unit prices are always read from the locked product row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Merge lines for the same product by summing quantities.
///
/// The result is ordered by product id, which is also the order rows are
/// locked in, so two concurrent checkouts never lock in opposite orders.
#[must_use]
pub fn consolidate_lines<I>(lines: I) -> Vec<(ProductId, i32)>
where
    I: IntoIterator<Item = (ProductId, i32)>,
{
    let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
    for (product_id, quantity) in lines {
        let entry = merged.entry(product_id).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }
    merged.into_iter().collect()
}

/// Aggregated sales for one product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopSellingProduct {
    pub product_id: ProductId,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

/// Admin dashboard summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_categories: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Sum of totals over orders that were not cancelled.
    pub total_revenue: Decimal,
    pub low_stock_products: Vec<super::Product>,
    pub recent_orders: Vec<Order>,
    pub top_selling_products: Vec<TopSellingProduct>,
}
