//! Product repository and the stock primitives used by checkout.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use freshcart_core::ProductId;

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.original_price, p.category_id,
           c.name AS category_name, p.image_url, p.unit, p.stock, p.featured,
           p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
";

/// Default selling unit for products created without one.
pub const DEFAULT_UNIT: &str = "each";

/// A product row locked for the remainder of a transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Append the `WHERE` clause for a listing filter.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");

    if let Some(category) = filter.category {
        builder.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(pattern) = filter.search_pattern() {
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND p.featured = ").push_bind(featured);
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching a filter, returning the page and the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let page = filter.page_request();

        let mut builder = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        push_filter(&mut builder, filter);
        // Sort column and direction come from closed enums, never from raw input.
        builder
            .push(" ORDER BY ")
            .push(filter.sort.as_sql())
            .push(" ")
            .push(filter.order.as_sql())
            .push(", p.id ")
            .push(filter.order.as_sql())
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filter(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(self.pool).await?;

        Ok((products, total))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.featured ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Products whose stock is strictly below `threshold`, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(
        &self,
        threshold: i32,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.stock < $1 ORDER BY p.stock ASC, p.id ASC LIMIT $2"
        ))
        .bind(threshold)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Count all products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails, including when
    /// `category_id` references a missing category.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let (id,): (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO products
                (name, description, price, original_price, category_id, image_url, unit, stock, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.category_id)
        .bind(&product.image_url)
        .bind(product.unit.as_deref().unwrap_or(DEFAULT_UNIT))
        .bind(product.stock)
        .bind(product.featured)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let updated: Option<(ProductId,)> = sqlx::query_as(
            r"
            UPDATE products
            SET name           = COALESCE($2, name),
                description    = COALESCE($3, description),
                price          = COALESCE($4, price),
                original_price = COALESCE($5, original_price),
                category_id    = COALESCE($6, category_id),
                image_url      = COALESCE($7, image_url),
                unit           = COALESCE($8, unit),
                stock          = COALESCE($9, stock),
                featured       = COALESCE($10, featured),
                updated_at     = NOW()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.original_price)
        .bind(patch.category_id)
        .bind(&patch.image_url)
        .bind(&patch.unit)
        .bind(patch.stock)
        .bind(patch.featured)
        .fetch_optional(self.pool)
        .await?;

        let (id,) = updated.ok_or(RepositoryError::NotFound)?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Cart, wishlist and order lines referencing it cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transactional stock primitives
// =============================================================================

/// Lock the given product rows `FOR UPDATE`, in ascending id order.
///
/// Missing ids are simply absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<LockedProduct>, RepositoryError> {
    let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
    let rows = sqlx::query_as::<_, LockedProduct>(
        r"
        SELECT id, name, price, stock
        FROM products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(raw)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Take `quantity` units out of stock if at least that many remain.
///
/// Returns `false` (and changes nothing) when stock is insufficient.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Put `quantity` units back into stock. A deleted product is skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restore_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(())
}
