//! Wishlist service.

use sqlx::PgPool;
use thiserror::Error;

use freshcart_core::{ProductId, UserId};

use crate::db::{ProductRepository, RepositoryError, WishlistRepository};
use crate::models::WishlistEntry;

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is not in your wishlist")]
    NotInWishlist,

    #[error("product is already in your wishlist")]
    AlreadyInWishlist,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Wishlist service.
pub struct WishlistService<'a> {
    wishlist: WishlistRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            wishlist: WishlistRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, WishlistError> {
        Ok(self.wishlist.list(user_id).await?)
    }

    /// Save a product and return the updated list.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::ProductNotFound` if the product doesn't exist.
    /// Returns `WishlistError::AlreadyInWishlist` if it is already saved.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<WishlistEntry>, WishlistError> {
        if self.products.get(product_id).await?.is_none() {
            return Err(WishlistError::ProductNotFound);
        }
        self.wishlist
            .add(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => WishlistError::AlreadyInWishlist,
                other => WishlistError::Repository(other),
            })?;
        self.list(user_id).await
    }

    /// Remove a saved product and return the updated list.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NotInWishlist` if it wasn't saved.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<WishlistEntry>, WishlistError> {
        self.wishlist
            .remove(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => WishlistError::NotInWishlist,
                other => WishlistError::Repository(other),
            })?;
        self.list(user_id).await
    }
}
