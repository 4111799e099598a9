//! Checkout and cancellation against a real database.
//!
//! Run with: `cargo test -p freshcart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use freshcart_api::models::OrderLineRequest;
use freshcart_api::services::orders::{CreateOrder, StatusUpdate};
use freshcart_api::services::{CartService, OrderError, OrderService};
use freshcart_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserRole};
use freshcart_integration_tests::{count_rows, create_product, create_user, stock_of};

fn checkout(items: Vec<OrderLineRequest>) -> CreateOrder {
    CreateOrder {
        shipping_address: "1 Orchard Rd".to_string(),
        payment_method: "card".to_string(),
        items,
    }
}

fn line(product_id: ProductId, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
        price: None,
    }
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_from_cart(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let bread = create_product(&pool, "Bread", 349, 5).await;
    let cart = CartService::new(&pool);
    cart.add_item(user.id, apples.id, 2).await.unwrap();
    cart.add_item(user.id, bread.id, 1).await.unwrap();

    let order = OrderService::new(&pool)
        .create_order(user.id, checkout(Vec::new()))
        .await
        .unwrap();

    assert_eq!(order.total_amount, Decimal::new(747, 2));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(stock_of(&pool, &apples).await, 8);
    assert_eq!(stock_of(&pool, &bread).await, 4);
    assert!(cart.get_cart(user.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_checkout_changes_nothing(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let bread = create_product(&pool, "Bread", 349, 1).await;
    let cart = CartService::new(&pool);
    cart.add_item(user.id, apples.id, 2).await.unwrap();
    cart.add_item(user.id, bread.id, 3).await.unwrap();

    let result = OrderService::new(&pool)
        .create_order(user.id, checkout(Vec::new()))
        .await;

    match result {
        Err(OrderError::InsufficientStock {
            product_id,
            requested,
            available,
        }) => {
            assert_eq!(product_id, bread.id);
            assert_eq!(requested, 3);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The first line's decrement was rolled back with everything else.
    assert_eq!(stock_of(&pool, &apples).await, 10);
    assert_eq!(stock_of(&pool, &bread).await, 1);
    assert_eq!(count_rows(&pool, "orders").await, 0);
    assert_eq!(count_rows(&pool, "order_items").await, 0);
    assert_eq!(cart.get_cart(user.id).await.unwrap().items.len(), 2);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_product_aborts_checkout(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;

    let result = OrderService::new(&pool)
        .create_order(
            user.id,
            checkout(vec![line(apples.id, 1), line(ProductId::new(9999), 1)]),
        )
        .await;

    assert!(matches!(result, Err(OrderError::ProductNotFound(id)) if id == ProductId::new(9999)));
    assert_eq!(stock_of(&pool, &apples).await, 10);
    assert_eq!(count_rows(&pool, "orders").await, 0);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_explicit_lines_are_priced_by_server_and_consolidated(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;

    let mut cheap = line(apples.id, 1);
    cheap.price = Some(Decimal::new(1, 2));
    let order = OrderService::new(&pool)
        .create_order(user.id, checkout(vec![cheap, line(apples.id, 2)]))
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.items[0].price, Decimal::new(199, 2));
    assert_eq!(order.total_amount, Decimal::new(597, 2));
    assert_eq!(stock_of(&pool, &apples).await, 7);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_and_blank_fields_rejected(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let service = OrderService::new(&pool);

    assert!(matches!(
        service.create_order(user.id, checkout(Vec::new())).await,
        Err(OrderError::Validation(msg)) if msg == "cart is empty"
    ));

    let mut request = checkout(Vec::new());
    request.shipping_address = "   ".to_string();
    assert!(matches!(
        service.create_order(user.id, request).await,
        Err(OrderError::Validation(_))
    ));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_restores_stock(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let bread = create_product(&pool, "Bread", 349, 5).await;
    let service = OrderService::new(&pool);

    let order = service
        .create_order(user.id, checkout(vec![line(apples.id, 4), line(bread.id, 2)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&pool, &apples).await, 6);

    let cancelled = service.cancel_order(order.id, user.id).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&pool, &apples).await, 10);
    assert_eq!(stock_of(&pool, &bread).await, 5);

    // A second cancel must not restore stock twice.
    assert!(matches!(
        service.cancel_order(order.id, user.id).await,
        Err(OrderError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Cancelled
        })
    ));
    assert_eq!(stock_of(&pool, &apples).await, 10);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_delivered_order_cannot_be_cancelled(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let service = OrderService::new(&pool);

    let order = service
        .create_order(user.id, checkout(vec![line(apples.id, 1)]))
        .await
        .unwrap();
    let delivered = service
        .update_status(
            order.id,
            &StatusUpdate {
                status: "delivered".to_string(),
                payment_status: Some("completed".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(delivered.payment_status, PaymentStatus::Completed);

    assert!(matches!(
        service.cancel_order(order.id, user.id).await,
        Err(OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            ..
        })
    ));
    assert_eq!(stock_of(&pool, &apples).await, 9);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_orders_are_private(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", UserRole::User).await;
    let other = create_user(&pool, "other@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let service = OrderService::new(&pool);

    let order = service
        .create_order(owner.id, checkout(vec![line(apples.id, 1)]))
        .await
        .unwrap();

    assert!(matches!(
        service.get_for_user(order.id, other.id).await,
        Err(OrderError::OrderNotFound)
    ));
    assert!(matches!(
        service.cancel_order(order.id, other.id).await,
        Err(OrderError::OrderNotFound)
    ));
    assert!(matches!(
        service.get(OrderId::new(9999)).await,
        Err(OrderError::OrderNotFound)
    ));
    assert_eq!(service.list_for_user(owner.id).await.unwrap().len(), 1);
    assert!(service.list_for_user(other.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_listing_and_bad_status(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let service = OrderService::new(&pool);

    let order = service
        .create_order(user.id, checkout(vec![line(apples.id, 1)]))
        .await
        .unwrap();

    let page = service
        .list_all(Default::default(), Some("pending"))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.items[0].id, order.id);

    let page = service
        .list_all(Default::default(), Some("shipped"))
        .await
        .unwrap();
    assert!(page.items.is_empty());

    assert!(matches!(
        service.list_all(Default::default(), Some("lost")).await,
        Err(OrderError::InvalidValue(_))
    ));
    assert!(matches!(
        service
            .update_status(
                order.id,
                &StatusUpdate {
                    status: "teleported".to_string(),
                    payment_status: None,
                },
            )
            .await,
        Err(OrderError::InvalidValue(_))
    ));

    let recent = service.recent_orders(5).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, order.id);

    let top = service.top_selling_products(5).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].total_quantity, 1);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_oversized_order_rejected_before_insert(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let truffles = create_product(&pool, "Crate of Truffles", 100_000, 5).await;
    let service = OrderService::new(&pool);

    match service
        .create_order(user.id, checkout(vec![line(truffles.id, 1_000_000)]))
        .await
    {
        Err(OrderError::InsufficientStock {
            product_id,
            requested,
            available,
        }) => {
            assert_eq!(product_id, truffles.id);
            assert_eq!(requested, 1_000_000);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    let saffron = create_product(&pool, "Saffron Vault", 9_999_999_999, 10).await;
    assert!(matches!(
        service
            .create_order(user.id, checkout(vec![line(saffron.id, 2)]))
            .await,
        Err(OrderError::Validation(_))
    ));

    let rice = create_product(&pool, "Rice", 99, 5000).await;
    assert!(matches!(
        service
            .create_order(user.id, checkout(vec![line(rice.id, 1000)]))
            .await,
        Err(OrderError::Validation(_))
    ));

    assert_eq!(count_rows(&pool, "orders").await, 0);
    assert_eq!(count_rows(&pool, "order_items").await, 0);
    assert_eq!(stock_of(&pool, &truffles).await, 5);
    assert_eq!(stock_of(&pool, &saffron).await, 10);
    assert_eq!(stock_of(&pool, &rice).await, 5000);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_top_sellers_rank_by_quantity_without_cancelled(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 50).await;
    let bread = create_product(&pool, "Bread", 349, 50).await;
    let milk = create_product(&pool, "Milk", 129, 50).await;
    let service = OrderService::new(&pool);

    let cancelled = service
        .create_order(user.id, checkout(vec![line(apples.id, 10)]))
        .await
        .unwrap();
    service.cancel_order(cancelled.id, user.id).await.unwrap();
    service
        .create_order(user.id, checkout(vec![line(apples.id, 2), line(bread.id, 1)]))
        .await
        .unwrap();
    service
        .create_order(user.id, checkout(vec![line(bread.id, 2), line(milk.id, 5)]))
        .await
        .unwrap();

    let top = service.top_selling_products(5).await.unwrap();
    let ranked: Vec<_> = top
        .iter()
        .map(|p| (p.product_id, p.total_quantity))
        .collect();
    assert_eq!(ranked, vec![(milk.id, 5), (bread.id, 3), (apples.id, 2)]);

    let top = service.top_selling_products(1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "Milk");
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_from_processing_and_shipped(pool: PgPool) {
    let user = create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let service = OrderService::new(&pool);

    for status in ["processing", "shipped"] {
        let order = service
            .create_order(user.id, checkout(vec![line(apples.id, 3)]))
            .await
            .unwrap();
        service
            .update_status(
                order.id,
                &StatusUpdate {
                    status: status.to_string(),
                    payment_status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(stock_of(&pool, &apples).await, 7);

        let cancelled = service.cancel_order(order.id, user.id).await.unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled, "from {status}");
        assert_eq!(stock_of(&pool, &apples).await, 10, "from {status}");
    }
}
