//! Order workflow.
//!
//! Checkout and cancellation each run in a single transaction. Product rows
//! are locked in ascending id order before any stock changes, unit prices are
//! taken from the locked rows, and stock only ever moves through the
//! conditional decrement in [`crate::db::products`]. Returning early with `?`
//! drops the transaction, which rolls everything back.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use freshcart_core::{
    InvalidValueError, OrderId, OrderStatus, PaymentStatus, ProductId, UserId, money,
};

use crate::db::{OrderRepository, RepositoryError, carts, orders, products};
use crate::models::order::consolidate_lines;
use crate::models::{
    MAX_LINE_QUANTITY, Order, OrderLineRequest, Page, PageRequest, Pagination, TopSellingProduct,
};

/// Largest amount an order total column can hold (`NUMERIC(10, 2)`).
fn max_order_total() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Errors from the order workflow.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    #[error("cannot change order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    InvalidValue(#[from] InvalidValueError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub shipping_address: String,
    pub payment_method: String,
    /// Lines to buy. Empty means "everything in my cart".
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

/// Admin status update. Values are parsed, not trusted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: String,
    pub payment_status: Option<String>,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for blank address/payment method, a
    /// line quantity outside `1..=MAX_LINE_QUANTITY`, a total too large to
    /// store, or nothing to buy.
    /// Returns `OrderError::ProductNotFound` if a product doesn't exist.
    /// Returns `OrderError::InsufficientStock` if a product can't cover its quantity.
    pub async fn create_order(
        &self,
        user_id: UserId,
        request: CreateOrder,
    ) -> Result<Order, OrderError> {
        let shipping_address = required(&request.shipping_address, "shipping address")?;
        let payment_method = required(&request.payment_method, "payment method")?;
        if request.items.iter().any(|line| line.quantity < 1) {
            return Err(OrderError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let requested = if request.items.is_empty() {
            carts::line_quantities(&mut *tx, user_id).await?
        } else {
            request
                .items
                .iter()
                .map(|line| (line.product_id, line.quantity))
                .collect()
        };
        let lines = consolidate_lines(requested);
        if lines.is_empty() {
            return Err(OrderError::Validation("cart is empty".to_string()));
        }

        let ids: Vec<ProductId> = lines.iter().map(|(id, _)| *id).collect();
        let locked = products::lock_products(&mut *tx, &ids).await?;

        // Both are sorted by product id.
        let mut priced: Vec<(ProductId, i32, Decimal, i32)> = Vec::with_capacity(lines.len());
        let mut locked_iter = locked.into_iter().peekable();
        for (product_id, quantity) in lines {
            let product = locked_iter
                .next_if(|p| p.id == product_id)
                .ok_or(OrderError::ProductNotFound(product_id))?;
            if quantity > product.stock {
                return Err(OrderError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock,
                });
            }
            if quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::Validation(format!(
                    "quantity must be at most {MAX_LINE_QUANTITY}"
                )));
            }
            priced.push((product_id, quantity, product.price, product.stock));
        }

        let total = money::sum_lines(priced.iter().map(|(_, qty, price, _)| (*price, *qty)));
        if total > max_order_total() {
            return Err(OrderError::Validation(format!(
                "order total exceeds {}",
                max_order_total()
            )));
        }
        let order_id =
            orders::insert_order(&mut *tx, user_id, total, &shipping_address, &payment_method)
                .await?;

        for (product_id, quantity, price, stock) in priced {
            orders::insert_item(&mut *tx, order_id, product_id, quantity, price).await?;
            if !products::decrement_stock(&mut *tx, product_id, quantity).await? {
                return Err(OrderError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: stock,
                });
            }
        }

        carts::clear_for_user(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(%order_id, %user_id, %total, "order placed");
        self.orders
            .find_for_user(order_id, user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)
    }

    /// Cancel one of the user's orders and put its stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` if the order doesn't exist or isn't the user's.
    /// Returns `OrderError::InvalidTransition` if the order is delivered or already cancelled.
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let status = orders::lock_for_user(&mut *tx, order_id, user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;
        if !status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: status,
                to: OrderStatus::Cancelled,
            });
        }

        orders::set_status(&mut *tx, order_id, OrderStatus::Cancelled).await?;
        for (product_id, quantity) in orders::item_quantities(&mut *tx, order_id).await? {
            products::restore_stock(&mut *tx, product_id, quantity).await?;
        }
        tx.commit().await?;

        tracing::info!(%order_id, %user_id, "order cancelled");
        self.orders
            .find_for_user(order_id, user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)
    }

    /// Admin override of an order's status. No transition rules apply.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidValue` for an unknown status string.
    /// Returns `OrderError::OrderNotFound` if the order doesn't exist.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        update: &StatusUpdate,
    ) -> Result<Order, OrderError> {
        let status: OrderStatus = update.status.parse()?;
        let payment_status = update
            .payment_status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()?;

        let order = self
            .orders
            .update_status(order_id, status, payment_status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::OrderNotFound,
                other => OrderError::Repository(other),
            })?;

        tracing::info!(%order_id, %status, "order status updated");
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` if the order doesn't exist or isn't the user's.
    pub async fn get_for_user(&self, order_id: OrderId, user_id: UserId) -> Result<Order, OrderError> {
        self.orders
            .find_for_user(order_id, user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)
    }

    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` if the order doesn't exist.
    pub async fn get(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .find(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound)
    }

    /// All orders, optionally filtered by a status string.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidValue` for an unknown status string.
    pub async fn list_all(
        &self,
        page: PageRequest,
        status: Option<&str>,
    ) -> Result<Page<Order>, OrderError> {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()?;

        let page = page.normalized();
        let (items, total) = self.orders.list_all(page, status).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.recent(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn top_selling_products(
        &self,
        limit: i64,
    ) -> Result<Vec<TopSellingProduct>, OrderError> {
        Ok(self.orders.top_selling(limit).await?)
    }
}

fn required(value: &str, field: &str) -> Result<String, OrderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OrderError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(matches!(
            required("  ", "shipping address"),
            Err(OrderError::Validation(msg)) if msg == "shipping address is required"
        ));
        assert_eq!(required(" card ", "payment method").unwrap(), "card");
    }

    #[test]
    fn test_create_order_items_default_empty() {
        let request: CreateOrder = serde_json::from_str(
            r#"{"shippingAddress": "1 Orchard Rd", "paymentMethod": "card"}"#,
        )
        .unwrap();
        assert!(request.items.is_empty());
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new(3),
            requested: 5,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 3: requested 5, available 2"
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "cannot change order from delivered to cancelled");
    }
}
