//! Cart repository.
//!
//! A user has at most one cart (`UNIQUE(user_id)`) and a cart has at most one
//! line per product (`UNIQUE(cart_id, product_id)`). Both constraints are
//! relied on directly through `ON CONFLICT`, so concurrent requests can never
//! create a second cart or a duplicate line.

use sqlx::{PgConnection, PgPool};

use freshcart_core::{CartId, CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartLine};

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's cart, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        self.find_by_user(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get the user's cart without creating one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// Lines of a cart joined with current product data, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r"
            SELECT ci.id, ci.product_id, p.name, p.image_url, p.unit, p.price,
                   p.original_price, p.stock, ci.quantity
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at ASC, ci.id ASC
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Add `quantity` of a product, accumulating onto an existing line.
    ///
    /// Returns `false`, leaving the line untouched, if the merged quantity
    /// would exceed `max_quantity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails, including when
    /// the product does not exist.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        max_quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            WHERE cart_items.quantity + EXCLUDED.quantity <= $4
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(max_quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch(cart_id).await?;
        Ok(true)
    }

    /// Overwrite the quantity of a line in the given cart.
    ///
    /// Returns `false` if the line does not belong to the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_items
            SET quantity = $3, updated_at = NOW()
            WHERE id = $2 AND cart_id = $1
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch(cart_id).await?;
        Ok(true)
    }

    /// Remove a line from the given cart.
    ///
    /// Returns `false` if the line does not belong to the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1")
            .bind(cart_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch(cart_id).await?;
        Ok(true)
    }

    /// Remove every line from a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        self.touch(cart_id).await
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// `(product_id, quantity)` pairs in the user's cart, for checkout.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn line_quantities(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<(ProductId, i32)>, RepositoryError> {
    let rows = sqlx::query_as(
        r"
        SELECT ci.product_id, ci.quantity
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        WHERE c.user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Empty the user's cart, if they have one, inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_for_user(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        DELETE FROM cart_items
        WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)
        ",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}
