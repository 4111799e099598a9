//! Category repository.

use sqlx::PgPool;

use freshcart_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, NewCategory};

const CATEGORY_SELECT: &str = r"
    SELECT c.id, c.name, c.description, c.image_url,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count,
           c.created_at, c.updated_at
    FROM categories c
";

/// Result of a guarded category deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCategoryOutcome {
    Deleted,
    NotFound,
    /// Products still reference the category.
    InUse(i64),
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by name, each with its product count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} ORDER BY c.name ASC"))
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(category)
    }

    /// Count all categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let (id,): (CategoryId,) = sqlx::query_as(
            "INSERT INTO categories (name, description, image_url) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image_url)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "category name"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> Result<Category, RepositoryError> {
        let updated: Option<(CategoryId,)> = sqlx::query_as(
            r"
            UPDATE categories
            SET name = $2, description = $3, image_url = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image_url)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "category name"))?;

        let (id,) = updated.ok_or(RepositoryError::NotFound)?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that no product references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete_if_unused(
        &self,
        id: CategoryId,
    ) -> Result<DeleteCategoryOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(CategoryId,)> =
            sqlx::query_as("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(DeleteCategoryOutcome::NotFound);
        }

        let (in_use,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if in_use > 0 {
            return Ok(DeleteCategoryOutcome::InUse(in_use));
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(DeleteCategoryOutcome::Deleted)
    }
}
