//! Cart service.
//!
//! Every mutation returns the recomputed [`CartView`], so clients never need
//! a second round trip to see new totals.

use sqlx::PgPool;
use thiserror::Error;

use freshcart_core::{CartItemId, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartView, MAX_LINE_QUANTITY};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart not found")]
    CartNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("quantity must be between 1 and 999")]
    InvalidQuantity,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user_id).await?;
        let lines = self.carts.lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }

    /// Add a product, merging with an existing line for the same product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` or the merged line
    /// falls outside `1..=MAX_LINE_QUANTITY`.
    /// Returns `CartError::ProductNotFound` if the product doesn't exist.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        check_quantity(quantity)?;
        if self.products.get(product_id).await?.is_none() {
            return Err(CartError::ProductNotFound);
        }

        let cart = self.carts.get_or_create(user_id).await?;
        if !self
            .carts
            .add_item(cart.id, product_id, quantity, MAX_LINE_QUANTITY)
            .await?
        {
            return Err(CartError::InvalidQuantity);
        }

        tracing::debug!(%user_id, %product_id, quantity, "added to cart");
        let lines = self.carts.lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }

    /// Overwrite the quantity of one of the user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is outside `1..=MAX_LINE_QUANTITY`.
    /// Returns `CartError::CartNotFound` if the user has no cart.
    /// Returns `CartError::ItemNotFound` if the line isn't in the user's cart.
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        check_quantity(quantity)?;
        let cart = self
            .carts
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        if !self.carts.set_quantity(cart.id, item_id, quantity).await? {
            return Err(CartError::ItemNotFound);
        }

        let lines = self.carts.lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }

    /// Remove one of the user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart.
    /// Returns `CartError::ItemNotFound` if the line isn't in the user's cart.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartView, CartError> {
        let cart = self
            .carts
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        if !self.carts.remove_item(cart.id, item_id).await? {
            return Err(CartError::ItemNotFound);
        }

        let lines = self.carts.lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }

    /// Remove every line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart.
    pub async fn clear(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart = self
            .carts
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        self.carts.clear(cart.id).await?;
        Ok(CartView::new(cart.id, Vec::new()))
    }
}

const fn check_quantity(quantity: i32) -> Result<(), CartError> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(CartError::InvalidQuantity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(check_quantity(0), Err(CartError::InvalidQuantity)));
        assert!(matches!(
            check_quantity(MAX_LINE_QUANTITY + 1),
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(check_quantity(i32::MAX), Err(CartError::InvalidQuantity)));
    }

    #[test]
    fn test_message_names_the_limit() {
        assert!(
            CartError::InvalidQuantity
                .to_string()
                .ends_with(&MAX_LINE_QUANTITY.to_string())
        );
    }
}
