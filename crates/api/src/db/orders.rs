//! Order repository.
//!
//! Reads go through [`OrderRepository`]. The writes that make up checkout and
//! cancellation are free functions over `&mut PgConnection` so the order
//! service can run them inside one transaction together with the stock and
//! cart primitives.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use freshcart_core::{Email, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, PageRequest, TopSellingProduct};

// =============================================================================
// Internal Row Types
// =============================================================================

const ORDER_SELECT: &str = r"
    SELECT o.id, o.user_id, u.email AS user_email, o.total_amount, o.shipping_address,
           o.payment_method, o.status, o.payment_status, o.created_at, o.updated_at
    FROM orders o
    JOIN users u ON u.id = o.user_id
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    user_email: String,
    total_amount: Decimal,
    shipping_address: String,
    payment_method: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(
        self,
        items: Vec<OrderItem>,
        with_email: bool,
    ) -> Result<Order, RepositoryError> {
        let user_email = if with_email {
            Some(Email::parse(&self.user_email).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?)
        } else {
            None
        };

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            user_email,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            status: self.status,
            payment_status: self.payment_status,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Load the line items of several orders at once, grouped by order.
async fn items_for(
    pool: &PgPool,
    order_ids: &[OrderId],
) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let raw: Vec<i32> = order_ids.iter().map(|id| id.as_i32()).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, p.image_url,
               oi.quantity, oi.price
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ANY($1)
        ORDER BY oi.id ASC
        ",
    )
    .bind(raw)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

/// Attach items to a batch of order rows, preserving row order.
async fn hydrate(
    pool: &PgPool,
    rows: Vec<OrderRow>,
    with_email: bool,
) -> Result<Vec<Order>, RepositoryError> {
    let ids: Vec<OrderId> = rows.iter().map(|row| row.id).collect();
    let mut items = items_for(pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines, with_email)
        })
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order reads and admin updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get any order by ID, including the customer's email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(hydrate(self.pool, vec![row], true).await?.pop()),
            None => Ok(None),
        }
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.id = $1 AND o.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(hydrate(self.pool, vec![row], false).await?.pop()),
            None => Ok(None),
        }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        hydrate(self.pool, rows, false).await
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        if let Some(status) = status {
            builder.push(" WHERE o.status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = builder
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;

        let total = match status {
            Some(status) => self.count_by_status(status).await?,
            None => self.count().await?,
        };

        Ok((hydrate(self.pool, rows, true).await?, total))
    }

    /// The most recent orders across all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        hydrate(self.pool, rows, true).await
    }

    /// Products ranked by units sold, ignoring cancelled orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_selling(&self, limit: i64) -> Result<Vec<TopSellingProduct>, RepositoryError> {
        let products = sqlx::query_as::<_, TopSellingProduct>(
            r"
            SELECT oi.product_id, p.name,
                   SUM(oi.quantity)::BIGINT AS total_quantity,
                   SUM(oi.quantity * oi.price) AS total_revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status <> 'cancelled'
            GROUP BY oi.product_id, p.name
            ORDER BY total_quantity DESC, oi.product_id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Overwrite an order's status, and its payment status when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                payment_status = COALESCE($3, payment_status),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.find(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Count all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count orders in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(&self, status: OrderStatus) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = $1")
            .bind(status)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of `total_amount` over orders that were not cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue(&self) -> Result<Decimal, RepositoryError> {
        let (sum,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> 'cancelled'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(sum)
    }
}

// =============================================================================
// Transactional primitives
// =============================================================================

/// Insert a new `pending` order and return its ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    total_amount: Decimal,
    shipping_address: &str,
    payment_method: &str,
) -> Result<OrderId, RepositoryError> {
    let (id,): (OrderId,) = sqlx::query_as(
        r"
        INSERT INTO orders (user_id, total_amount, shipping_address, payment_method, status, payment_status)
        VALUES ($1, $2, $3, $4, 'pending', 'pending')
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(total_amount)
    .bind(shipping_address)
    .bind(payment_method)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Insert one frozen order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock a user's order row and return its status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_user(
    conn: &mut PgConnection,
    id: OrderId,
    user_id: UserId,
) -> Result<Option<OrderStatus>, RepositoryError> {
    let status: Option<(OrderStatus,)> =
        sqlx::query_as("SELECT status FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(status.map(|(s,)| s))
}

/// `(product_id, quantity)` for every line of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn item_quantities(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Vec<(ProductId, i32)>, RepositoryError> {
    let rows = sqlx::query_as(
        "SELECT product_id, quantity FROM order_items WHERE order_id = $1 ORDER BY product_id",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Set an order's status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}
