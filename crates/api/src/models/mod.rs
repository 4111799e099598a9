//! Domain models for FreshCart.
//!
//! These are validated domain types, separate from the `sqlx` row types that
//! live next to the queries in [`crate::db`]. Everything here serializes
//! straight into API responses.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;
pub mod wishlist;

use serde::{Deserialize, Serialize};

pub use cart::{Cart, CartLine, CartView, MAX_LINE_QUANTITY};
pub use catalog::{Category, NewCategory, NewProduct, Product, ProductFilter, ProductPatch};
pub use order::{DashboardStats, Order, OrderItem, OrderLineRequest, TopSellingProduct};
pub use user::{CurrentUser, NewUser, ProfileUpdate, User};
pub use wishlist::WishlistEntry;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: i64 = 12;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Largest page number; keeps `offset()` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Page request parsed from `page` / `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: i64,
    /// Items per page.
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp to `1 <= page <= MAX_PAGE` and `1 <= limit <= MAX_PAGE_SIZE`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(1, MAX_PAGE),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Row offset for `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Build metadata for a normalized page request and a total row count.
    #[must_use]
    pub const fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.limit - 1) / request.limit
        };
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_normalized() {
        let req = PageRequest { page: 0, limit: 500 }.normalized();
        assert_eq!(req, PageRequest { page: 1, limit: MAX_PAGE_SIZE });
        let req = PageRequest { page: 3, limit: 0 }.normalized();
        assert_eq!(req.limit, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let req = PageRequest {
            page: i64::MAX,
            limit: MAX_PAGE_SIZE,
        }
        .normalized();
        assert_eq!(req.page, MAX_PAGE);
        assert!(req.offset() > 0);

        let raw = PageRequest {
            page: i64::MAX,
            limit: i64::MAX,
        };
        assert_eq!(raw.offset(), i64::MAX);
    }

    #[test]
    fn test_pagination_total_pages() {
        let req = PageRequest { page: 1, limit: 12 };
        assert_eq!(Pagination::new(req, 0).total_pages, 0);
        assert_eq!(Pagination::new(req, 12).total_pages, 1);
        assert_eq!(Pagination::new(req, 13).total_pages, 2);
    }
}
