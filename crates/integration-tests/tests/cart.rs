//! Cart workflows against a real database.
//!
//! Run with: `cargo test -p freshcart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use freshcart_api::db::CartRepository;
use freshcart_api::services::{CartError, CartService};
use freshcart_core::{CartItemId, ProductId, UserRole};
use freshcart_integration_tests::{count_rows, create_product, create_user};

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_get_or_create_is_idempotent(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let carts = CartRepository::new(&pool);

    let first = carts.get_or_create(user.id).await.unwrap();
    let second = carts.get_or_create(user.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(count_rows(&pool, "carts").await, 1);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_adding_same_product_accumulates(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 50).await;
    let service = CartService::new(&pool);

    service.add_item(user.id, apples.id, 2).await.unwrap();
    let cart = service.add_item(user.id, apples.id, 3).await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(count_rows(&pool, "cart_items").await, 1);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_totals(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 50).await;
    let bread = create_product(&pool, "Bread", 349, 10).await;
    let service = CartService::new(&pool);

    service.add_item(user.id, apples.id, 2).await.unwrap();
    let cart = service.add_item(user.id, bread.id, 1).await.unwrap();

    assert_eq!(cart.subtotal, Decimal::new(747, 2));
    assert_eq!(cart.total, Decimal::new(747, 2));
    assert_eq!(cart.item_count, 3);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_remove_and_clear(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 50).await;
    let bread = create_product(&pool, "Bread", 349, 10).await;
    let service = CartService::new(&pool);

    service.add_item(user.id, apples.id, 1).await.unwrap();
    let cart = service.add_item(user.id, bread.id, 1).await.unwrap();
    let apple_line = cart.items.iter().find(|l| l.product_id == apples.id).unwrap().id;

    let cart = service
        .update_item_quantity(user.id, apple_line, 4)
        .await
        .unwrap();
    assert_eq!(cart.item_count, 5);

    let cart = service.remove_item(user.id, apple_line).await.unwrap();
    assert_eq!(cart.items.len(), 1);

    let cart = service.clear(user.id).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(count_rows(&pool, "cart_items").await, 0);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_rejects_bad_input(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let other = create_user(&pool, "other@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 50).await;
    let service = CartService::new(&pool);

    assert!(matches!(
        service.add_item(user.id, apples.id, 0).await,
        Err(CartError::InvalidQuantity)
    ));
    assert!(matches!(
        service.add_item(user.id, ProductId::new(9999), 1).await,
        Err(CartError::ProductNotFound)
    ));

    // No cart yet for this user.
    assert!(matches!(
        service.clear(other.id).await,
        Err(CartError::CartNotFound)
    ));

    // Another user's line is invisible.
    let cart = service.add_item(user.id, apples.id, 1).await.unwrap();
    let line = cart.items[0].id;
    service.get_cart(other.id).await.unwrap();
    assert!(matches!(
        service.remove_item(other.id, line).await,
        Err(CartError::ItemNotFound)
    ));
    assert!(matches!(
        service.update_item_quantity(user.id, CartItemId::new(9999), 2).await,
        Err(CartError::ItemNotFound)
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_line_quantity_is_capped(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 5000).await;
    let service = CartService::new(&pool);

    let cart = service.add_item(user.id, apples.id, 999).await.unwrap();
    assert_eq!(cart.items[0].quantity, 999);

    assert!(matches!(
        service.add_item(user.id, apples.id, 1).await,
        Err(CartError::InvalidQuantity)
    ));
    assert!(matches!(
        service.add_item(user.id, apples.id, i32::MAX).await,
        Err(CartError::InvalidQuantity)
    ));
    assert!(matches!(
        service
            .update_item_quantity(user.id, cart.items[0].id, 1000)
            .await,
        Err(CartError::InvalidQuantity)
    ));

    let cart = service.get_cart(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 999);
}
