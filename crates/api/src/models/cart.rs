//! Cart domain types and derived totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use freshcart_core::{CartId, CartItemId, ProductId, UserId, money};

/// Largest quantity a single cart or order line may hold.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// A user's cart row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One cart line joined with the product's current catalog data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub unit: String,
    /// Current product price, not a snapshot.
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub stock: i32,
    pub quantity: i32,
}

impl CartLine {
    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        money::line_total(self.price, self.quantity)
    }
}

/// The cart as returned to clients: lines plus totals derived from current prices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartLine>,
    /// Sum of quantities across lines.
    pub item_count: i64,
    /// `Σ price × quantity`.
    pub subtotal: Decimal,
    /// `Σ (original_price − price) × quantity` over marked-down lines.
    pub discount: Decimal,
    pub total: Decimal,
}

impl CartView {
    /// Derive totals for a cart's lines.
    #[must_use]
    pub fn new(cart_id: CartId, items: Vec<CartLine>) -> Self {
        let subtotal = money::sum_lines(items.iter().map(|line| (line.price, line.quantity)));
        let discount = money::round(
            items
                .iter()
                .map(|line| money::line_discount(line.price, line.original_price, line.quantity))
                .sum(),
        );
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();

        Self {
            id: cart_id,
            items,
            item_count,
            subtotal,
            discount,
            total: subtotal,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        id: i32,
        product: i32,
        price: Decimal,
        original: Option<Decimal>,
        quantity: i32,
    ) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            name: format!("product {product}"),
            image_url: None,
            unit: "each".to_string(),
            price,
            original_price: original,
            stock: 100,
            quantity,
        }
    }

    #[test]
    fn test_subtotal_of_two_lines() {
        let view = CartView::new(
            CartId::new(1),
            vec![
                line(1, 10, Decimal::new(199, 2), None, 2),
                line(2, 11, Decimal::new(349, 2), None, 1),
            ],
        );
        assert_eq!(view.subtotal, Decimal::new(747, 2));
        assert_eq!(view.total, view.subtotal);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.discount, Decimal::ZERO);
    }

    #[test]
    fn test_discount_uses_original_price() {
        let view = CartView::new(
            CartId::new(1),
            vec![
                // 0.50 off, three of them
                line(1, 10, Decimal::new(250, 2), Some(Decimal::new(300, 2)), 3),
                line(2, 11, Decimal::new(100, 2), None, 4),
            ],
        );
        assert_eq!(view.discount, Decimal::new(150, 2));
        assert_eq!(view.subtotal, Decimal::new(1150, 2));
    }

    #[test]
    fn test_empty_cart() {
        let view = CartView::new(CartId::new(7), Vec::new());
        assert!(view.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
        assert_eq!(view.item_count, 0);
    }
}
