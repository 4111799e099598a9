//! Catalog listing, category guard, wishlist and dashboard.
//!
//! Run with: `cargo test -p freshcart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use freshcart_api::models::{NewCategory, ProductFilter, ProductPatch};
use freshcart_api::models::catalog::{SortColumn, SortOrder};
use freshcart_api::services::{
    AdminService, CatalogError, CatalogService, WishlistError, WishlistService,
};
use freshcart_core::UserRole;
use freshcart_integration_tests::{create_product, create_user};

fn category(name: &str) -> NewCategory {
    NewCategory {
        name: name.to_string(),
        description: None,
        image_url: None,
    }
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_category_in_use_cannot_be_deleted(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let fruit = catalog.create_category(category("Fruit")).await.unwrap();
    let apples = create_product(&pool, "Apples", 199, 10).await;
    catalog
        .update_product(
            apples.id,
            ProductPatch {
                category_id: Some(fruit.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        catalog.delete_category(fruit.id).await,
        Err(CatalogError::CategoryInUse(1))
    ));
    assert_eq!(catalog.get_category(fruit.id).await.unwrap().product_count, 1);

    catalog.delete_product(apples.id).await.unwrap();
    catalog.delete_category(fruit.id).await.unwrap();
    assert!(matches!(
        catalog.get_category(fruit.id).await,
        Err(CatalogError::CategoryNotFound)
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_category_name(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    catalog.create_category(category("Dairy")).await.unwrap();

    assert!(matches!(
        catalog.create_category(category("Dairy")).await,
        Err(CatalogError::DuplicateCategory)
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_product_listing_filters_and_pages(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    create_product(&pool, "Green Apples", 199, 10).await;
    create_product(&pool, "Red Apples", 249, 10).await;
    create_product(&pool, "Bread", 349, 10).await;

    let page = catalog
        .list_products(&ProductFilter {
            search: Some("apple".to_string()),
            sort: SortColumn::Price,
            order: SortOrder::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.items[0].name, "Green Apples");

    let page = catalog
        .list_products(&ProductFilter {
            min_price: Some(Decimal::new(200, 2)),
            limit: Some(1),
            page: Some(2),
            sort: SortColumn::Name,
            order: SortOrder::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Red Apples");

    assert!(matches!(
        catalog
            .list_products(&ProductFilter {
                min_price: Some(Decimal::new(500, 2)),
                max_price: Some(Decimal::new(100, 2)),
                ..Default::default()
            })
            .await,
        Err(CatalogError::Validation(_))
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_wishlist_pairs_are_unique(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let wishlist = WishlistService::new(&pool);

    let entries = wishlist.add(user.id, apples.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product_id, apples.id);

    assert!(matches!(
        wishlist.add(user.id, apples.id).await,
        Err(WishlistError::AlreadyInWishlist)
    ));

    assert!(wishlist.remove(user.id, apples.id).await.unwrap().is_empty());
    assert!(matches!(
        wishlist.remove(user.id, apples.id).await,
        Err(WishlistError::NotInWishlist)
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_dashboard_counts(pool: PgPool) {
    create_user(&pool, "admin@example.com", UserRole::Admin).await;
    create_product(&pool, "Apples", 199, 3).await;
    create_product(&pool, "Bread", 349, 40).await;

    let stats = AdminService::new(&pool, 10).dashboard_stats().await.unwrap();

    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.total_revenue, Decimal::ZERO);
    assert_eq!(stats.low_stock_products.len(), 1);
    assert_eq!(stats.low_stock_products[0].name, "Apples");
}
