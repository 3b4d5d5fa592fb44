//! Wishlist rows.

use chrono::{DateTime, Utc};

use technova_core::{Price, ProductId, WishlistItemId};

use super::catalog::media_url;

/// A wishlist entry joined with the product it points at.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub category_slug: String,
    pub primary_image: Option<String>,
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

impl WishlistEntry {
    #[must_use]
    pub fn product_url(&self) -> String {
        format!("/categories/{}/{}", self.category_slug, self.product_slug)
    }

    #[must_use]
    pub fn image_url(&self) -> String {
        media_url(self.primary_image.as_deref())
    }
}
