//! Sample catalog data for local development.

use rust_decimal::Decimal;

use freshcart_api::db::ProductRepository;
use freshcart_api::models::{NewCategory, NewProduct};
use freshcart_api::services::CatalogService;

use super::{CliError, connect};

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    /// Price in cents.
    price: i64,
    /// Pre-discount price in cents.
    original_price: Option<i64>,
    unit: &'static str,
    stock: i32,
    featured: bool,
}

const CATALOG: &[(&str, &str, &[SeedProduct])] = &[
    (
        "Fruits",
        "Fresh seasonal fruit",
        &[
            SeedProduct {
                name: "Gala Apples",
                description: "Crisp and sweet, sold by the pound",
                price: 199,
                original_price: Some(249),
                unit: "lb",
                stock: 120,
                featured: true,
            },
            SeedProduct {
                name: "Bananas",
                description: "Ripe yellow bananas",
                price: 69,
                original_price: None,
                unit: "lb",
                stock: 200,
                featured: false,
            },
        ],
    ),
    (
        "Vegetables",
        "Farm-fresh vegetables",
        &[
            SeedProduct {
                name: "Baby Spinach",
                description: "Pre-washed, 5 oz clamshell",
                price: 299,
                original_price: None,
                unit: "each",
                stock: 40,
                featured: true,
            },
            SeedProduct {
                name: "Carrots",
                description: "Whole carrots, 2 lb bag",
                price: 149,
                original_price: None,
                unit: "bag",
                stock: 8,
                featured: false,
            },
        ],
    ),
    (
        "Bakery",
        "Bread and pastries baked daily",
        &[SeedProduct {
            name: "Sourdough Loaf",
            description: "Naturally leavened, baked this morning",
            price: 349,
            original_price: None,
            unit: "each",
            stock: 25,
            featured: true,
        }],
    ),
    (
        "Dairy",
        "Milk, cheese and eggs",
        &[
            SeedProduct {
                name: "Whole Milk",
                description: "One gallon",
                price: 379,
                original_price: Some(429),
                unit: "gal",
                stock: 30,
                featured: false,
            },
            SeedProduct {
                name: "Large Brown Eggs",
                description: "One dozen, free range",
                price: 459,
                original_price: None,
                unit: "dozen",
                stock: 5,
                featured: false,
            },
        ],
    ),
];

/// Insert the sample catalog.
///
/// Skips when products already exist unless `force` is set.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails
/// (for example a category name that already exists).
pub async fn run(force: bool) -> Result<(), CliError> {
    let pool = connect().await?;

    let existing = ProductRepository::new(&pool).count().await?;
    if existing > 0 && !force {
        tracing::info!("{existing} products already exist, skipping seed (use --force to seed anyway)");
        pool.close().await;
        return Ok(());
    }

    let catalog = CatalogService::new(&pool);
    let mut inserted = 0;
    for (category_name, category_description, products) in CATALOG {
        let category = catalog
            .create_category(NewCategory {
                name: (*category_name).to_string(),
                description: Some((*category_description).to_string()),
                image_url: None,
            })
            .await?;

        for product in *products {
            catalog
                .create_product(NewProduct {
                    name: product.name.to_string(),
                    description: Some(product.description.to_string()),
                    price: Decimal::new(product.price, 2),
                    original_price: product.original_price.map(|cents| Decimal::new(cents, 2)),
                    category_id: Some(category.id),
                    image_url: None,
                    unit: Some(product.unit.to_string()),
                    stock: product.stock,
                    featured: product.featured,
                })
                .await?;
            inserted += 1;
        }
        tracing::info!(category = %category.name, "seeded category");
    }

    tracing::info!("Seeding complete! {inserted} products inserted");
    pool.close().await;
    Ok(())
}
