//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users`, `email_verification_tokens` - Accounts and pending verifications
//! - `categories`, `products`, `product_images` - Catalog
//! - `carts`, `cart_items` - Shopping carts (user- or session-owned)
//! - `orders`, `order_items` - Placed orders with frozen line snapshots
//! - `reviews` - Product reviews; approved ones feed `products.average_rating`
//! - `wishlist_items` - Saved products
//! - `newsletter_subscribers`, `contact_messages` - Site forms
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p technova-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
pub mod contact;
pub mod dashboard;
pub mod newsletter;
pub mod orders;
pub mod reviews;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use contact::ContactRepository;
pub use dashboard::DashboardRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict(what)`, anything else to `Database`.
    pub(crate) fn from_unique(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(e)
    }

    /// Whether this is a unique-constraint conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Offset/limit pagination for list pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub per_page: u32,
}

impl Page {
    /// Page `number` (clamped to at least 1).
    #[must_use]
    pub fn new(number: Option<u32>, per_page: u32) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.per_page)
    }

    /// Total page count for `total` rows (at least 1).
    #[must_use]
    pub fn total_pages(&self, total: i64) -> u32 {
        let per_page = i64::from(self.per_page);
        let pages = (total.max(0) + per_page - 1) / per_page;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        let page = Page::new(Some(3), 10);
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(Page::new(None, 10).offset(), 0);
        assert_eq!(Page::new(Some(0), 10).number, 1);
    }

    #[test]
    fn test_total_pages() {
        let page = Page::new(None, 10);
        assert_eq!(page.total_pages(0), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
        assert_eq!(page.total_pages(95), 10);
    }

    #[test]
    fn test_from_unique_passes_other_errors_through() {
        let err = RepositoryError::from_unique(sqlx::Error::RowNotFound, "email");
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(!err.is_conflict());
    }
}
