//! Catalog domain types: categories, products and listing filters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_core::{CategoryId, ProductId};

use super::PageRequest;

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Number of products currently in the category.
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A product on the shelf.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Pre-markdown price shown struck through; `None` when not discounted.
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    /// Selling unit, e.g. `kg` or `each`.
    pub unit: String,
    pub stock: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub unit: Option<String>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
}

/// Column a product listing may be sorted by.
///
/// Only these columns ever reach the `ORDER BY` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    Price,
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    Stock,
}

impl SortColumn {
    /// The qualified SQL column.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::CreatedAt => "p.created_at",
            Self::Stock => "p.stock",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Product listing filter, parsed from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub sort: SortColumn,
    pub order: SortOrder,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductFilter {
    /// The normalized page request for this filter.
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
        .normalized()
    }

    /// The search term wrapped for `ILIKE`, with LIKE metacharacters escaped.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ProductFilter {
            search: Some(" 100%_juice ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_pattern().unwrap(), "%100\\%\\_juice%");
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let filter = ProductFilter {
            page: Some(i64::MAX),
            ..Default::default()
        };
        let page = filter.page_request();
        assert_eq!(page.page, crate::models::MAX_PAGE);
        assert!(page.offset() >= 0);
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.search_pattern().is_none());
    }

    #[test]
    fn test_filter_deserializes_from_query_shape() {
        let filter: ProductFilter = serde_json::from_value(serde_json::json!({
            "category": 4,
            "minPrice": "1.50",
            "sort": "price",
            "order": "asc",
            "page": 2,
            "limit": 500
        }))
        .unwrap();
        assert_eq!(filter.category, Some(CategoryId::new(4)));
        assert_eq!(filter.min_price, Some(Decimal::new(150, 2)));
        assert_eq!(filter.sort, SortColumn::Price);
        assert_eq!(filter.order, SortOrder::Asc);
        let page = filter.page_request();
        assert_eq!((page.page, page.limit), (2, 100));
    }

    #[test]
    fn test_sort_defaults() {
        let filter = ProductFilter::default();
        assert_eq!(filter.sort.as_sql(), "p.created_at");
        assert_eq!(filter.order.as_sql(), "DESC");
    }
}
