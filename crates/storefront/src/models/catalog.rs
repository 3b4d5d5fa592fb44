//! Catalog types: categories, products and gallery images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use technova_core::{
    CategoryId, Price, ProductCondition, ProductId, ProductImageId, ProductStatus,
};

/// Image shown when a product or category has none.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// Public URL for an uploaded media path.
#[must_use]
pub fn media_url(path: Option<&str>) -> String {
    match path.map(str::trim) {
        Some(p) if !p.is_empty() => format!("/media/{}", p.trim_start_matches('/')),
        _ => PLACEHOLDER_IMAGE.to_owned(),
    }
}

/// A product category. Categories nest one level via `parent_id`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl Category {
    #[must_use]
    pub fn url(&self) -> String {
        format!("/categories/{}", self.slug)
    }

    #[must_use]
    pub fn image_url(&self) -> String {
        media_url(self.image.as_deref())
    }
}

/// A product joined with its category's name and slug.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_slug: String,
    pub brand: String,
    pub model: String,
    pub sku: Option<String>,
    pub price: Price,
    pub compare_at_price: Option<Price>,
    pub cost_price: Option<Price>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub specifications: serde_json::Value,
    pub features: serde_json::Value,
    pub primary_image: Option<String>,
    pub condition: ProductCondition,
    pub status: ProductStatus,
    pub average_rating: Decimal,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Selling below the compare-at price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|c| c > self.price)
    }

    /// Whole-percent discount against the compare-at price, truncated.
    #[must_use]
    pub fn discount_percentage(&self) -> i64 {
        match self.compare_at_price {
            Some(compare_at) if self.is_on_sale() && compare_at.is_positive() => {
                let ratio = (compare_at.amount() - self.price.amount()) / compare_at.amount();
                (ratio * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(0)
            }
            _ => 0,
        }
    }

    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }

    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }

    /// Whether the product can be put in a cart right now.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.status.is_purchasable() && !self.is_out_of_stock()
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("/categories/{}/{}", self.category_slug, self.slug)
    }

    #[must_use]
    pub fn image_url(&self) -> String {
        media_url(self.primary_image.as_deref())
    }

    /// Specification table rows, in key order.
    #[must_use]
    pub fn specification_pairs(&self) -> Vec<(String, String)> {
        let Some(map) = self.specifications.as_object() else {
            return Vec::new();
        };
        map.iter()
            .map(|(key, value)| {
                let value = value
                    .as_str()
                    .map_or_else(|| value.to_string(), str::to_owned);
                (key.clone(), value)
            })
            .collect()
    }

    /// Feature bullet points.
    #[must_use]
    pub fn feature_list(&self) -> Vec<String> {
        self.features
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Additional gallery image.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: String,
    pub alt_text: String,
    pub sort_order: i32,
}

impl ProductImage {
    #[must_use]
    pub fn url(&self) -> String {
        media_url(Some(&self.image))
    }
}
