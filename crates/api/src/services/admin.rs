//! Admin dashboard aggregates.

use sqlx::PgPool;

use freshcart_core::OrderStatus;

use crate::db::{
    CategoryRepository, OrderRepository, ProductRepository, RepositoryError, UserRepository,
};
use crate::models::{DashboardStats, Product};

/// Recent orders shown on the dashboard.
const RECENT_ORDERS: i64 = 5;
/// Top sellers shown on the dashboard.
const TOP_SELLERS: i64 = 5;
/// Upper bound on the low-stock list.
const LOW_STOCK_LIMIT: i64 = 50;

/// Read-only admin aggregates.
pub struct AdminService<'a> {
    users: UserRepository<'a>,
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
    orders: OrderRepository<'a>,
    low_stock_threshold: i32,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, low_stock_threshold: i32) -> Self {
        Self {
            users: UserRepository::new(pool),
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
            orders: OrderRepository::new(pool),
            low_stock_threshold,
        }
    }

    /// Store-wide counts, revenue, low stock, recent orders and top sellers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        Ok(DashboardStats {
            total_users: self.users.count().await?,
            total_products: self.products.count().await?,
            total_categories: self.categories.count().await?,
            total_orders: self.orders.count().await?,
            pending_orders: self.orders.count_by_status(OrderStatus::Pending).await?,
            total_revenue: self.orders.revenue().await?,
            low_stock_products: self.low_stock_products().await?,
            recent_orders: self.orders.recent(RECENT_ORDERS).await?,
            top_selling_products: self.orders.top_selling(TOP_SELLERS).await?,
        })
    }

    /// Products with stock below the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn low_stock_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.products
            .low_stock(self.low_stock_threshold, LOW_STOCK_LIMIT)
            .await
    }
}
