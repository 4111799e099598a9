//! Wishlist repository.

use sqlx::PgPool;

use freshcart_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::WishlistEntry;

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's saved products, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(
            r"
            SELECT w.id, w.product_id, p.name, p.price, p.original_price, p.image_url,
                   p.stock, w.created_at AS added_at
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.created_at DESC, w.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already saved.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::unique_violation(e, "wishlist entry"))?;
        Ok(())
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product wasn't saved.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
