//! Catalog service: products and categories.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use freshcart_core::{CategoryId, ProductId};

use crate::db::categories::DeleteCategoryOutcome;
use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{
    Category, NewCategory, NewProduct, Page, Pagination, Product, ProductFilter, ProductPatch,
};

/// Upper bound for `featured` listings.
pub const MAX_FEATURED: i64 = 24;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    ProductNotFound,

    #[error("category not found")]
    CategoryNotFound,

    /// Products still reference the category.
    #[error("category still has {0} product(s)")]
    CategoryInUse(i64),

    #[error("a category with this name already exists")]
    DuplicateCategory,

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Filtered, sorted and paginated product listing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if `min_price > max_price`.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, CatalogError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
            && min > max
        {
            return Err(CatalogError::Validation(
                "minPrice cannot exceed maxPrice".to_string(),
            ));
        }

        let (items, total) = self.products.list(filter).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(filter.page_request(), total),
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product doesn't exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.featured(limit.clamp(1, MAX_FEATURED)).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name or negative price/stock.
    /// Returns `CatalogError::CategoryNotFound` if the category doesn't exist.
    pub async fn create_product(&self, mut product: NewProduct) -> Result<Product, CatalogError> {
        product.name = required_name(&product.name, "product")?;
        validate_price(product.price, "price")?;
        if let Some(original) = product.original_price {
            validate_price(original, "originalPrice")?;
        }
        validate_stock(product.stock)?;
        if let Some(category) = product.category_id {
            self.require_category(category).await?;
        }

        let created = self.products.create(&product).await?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product doesn't exist.
    /// Returns `CatalogError::Validation` for invalid fields.
    pub async fn update_product(
        &self,
        id: ProductId,
        mut patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        if let Some(name) = &patch.name {
            patch.name = Some(required_name(name, "product")?);
        }
        if let Some(price) = patch.price {
            validate_price(price, "price")?;
        }
        if let Some(original) = patch.original_price {
            validate_price(original, "originalPrice")?;
        }
        if let Some(stock) = patch.stock {
            validate_stock(stock)?;
        }
        if let Some(category) = patch.category_id {
            self.require_category(category).await?;
        }

        self.products
            .update(id, &patch)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => CatalogError::Repository(other),
            })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product doesn't exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::ProductNotFound,
            other => CatalogError::Repository(other),
        })?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.list().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if the category doesn't exist.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.categories
            .get(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateCategory` if the name is taken.
    pub async fn create_category(&self, mut input: NewCategory) -> Result<Category, CatalogError> {
        input.name = required_name(&input.name, "category")?;
        self.categories
            .create(&input)
            .await
            .map_err(map_category_error)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if the category doesn't exist.
    /// Returns `CatalogError::DuplicateCategory` if the name is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        mut input: NewCategory,
    ) -> Result<Category, CatalogError> {
        input.name = required_name(&input.name, "category")?;
        self.categories
            .update(id, &input)
            .await
            .map_err(map_category_error)
    }

    /// Delete a category that no product references.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if the category doesn't exist.
    /// Returns `CatalogError::CategoryInUse` if products still reference it.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        match self.categories.delete_if_unused(id).await? {
            DeleteCategoryOutcome::Deleted => {
                tracing::info!(category_id = %id, "category deleted");
                Ok(())
            }
            DeleteCategoryOutcome::NotFound => Err(CatalogError::CategoryNotFound),
            DeleteCategoryOutcome::InUse(count) => Err(CatalogError::CategoryInUse(count)),
        }
    }

    async fn require_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        if self.categories.get(id).await?.is_none() {
            return Err(CatalogError::CategoryNotFound);
        }
        Ok(())
    }
}

fn map_category_error(e: RepositoryError) -> CatalogError {
    match e {
        RepositoryError::NotFound => CatalogError::CategoryNotFound,
        RepositoryError::Conflict(_) => CatalogError::DuplicateCategory,
        other => CatalogError::Repository(other),
    }
}

fn required_name(name: &str, what: &str) -> Result<String, CatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(format!("{what} name is required")));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal, field: &str) -> Result<(), CatalogError> {
    if price.is_sign_negative() {
        return Err(CatalogError::Validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), CatalogError> {
    if stock < 0 {
        return Err(CatalogError::Validation("stock cannot be negative".to_string()));
    }
    Ok(())
}
