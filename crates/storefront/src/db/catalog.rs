//! Catalog queries: categories, products and gallery images.

use sqlx::PgPool;

use technova_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::{Category, Product, ProductImage};

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, image, parent_id, is_active, sort_order";

/// Product columns joined with the category name and slug (`p` and `c`).
const PRODUCT_SELECT: &str = "\
    SELECT p.id, p.name, p.slug, p.description, p.short_description, p.category_id, \
           c.name AS category_name, c.slug AS category_slug, \
           p.brand, p.model, p.sku, p.price, p.compare_at_price, p.cost_price, \
           p.stock_quantity, p.low_stock_threshold, p.specifications, p.features, \
           p.primary_image, p.condition, p.status, p.average_rating, p.review_count, \
           p.created_at, p.updated_at, p.published_at \
    FROM products p \
    JOIN categories c ON c.id = p.category_id";

/// Listed products: active and in stock.
const LISTABLE: &str = "p.status = 'active' AND p.stock_quantity > 0";

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Seed data for a category.
#[derive(Debug, Clone, Copy)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub sort_order: i32,
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories without a parent, by `(sort_order, name)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_level_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE parent_id IS NULL AND is_active \
             ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// An active category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1 AND is_active");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Active direct children of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subcategories(&self, parent: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE parent_id = $1 AND is_active \
             ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(parent)
            .fetch_all(self.pool)
            .await?)
    }

    /// Insert a category unless its slug exists. Returns whether a row was added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name belongs to another slug.
    pub async fn insert_category(&self, new: NewCategory<'_>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO categories (name, slug, sort_order) VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(new.name)
        .bind(new.slug)
        .bind(new.sort_order)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category name"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Newest listable products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE {LISTABLE} ORDER BY p.created_at DESC LIMIT $1");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Listable products of a category and its direct subcategories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT} \
             WHERE {LISTABLE} AND (p.category_id = $1 OR c.parent_id = $1) \
             ORDER BY p.created_at DESC"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(self.pool)
            .await?)
    }

    /// Every listable product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE {LISTABLE} ORDER BY p.created_at DESC");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Listable products priced below their compare-at price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sale_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT} \
             WHERE {LISTABLE} AND p.compare_at_price IS NOT NULL AND p.compare_at_price > p.price \
             ORDER BY p.created_at DESC"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Case-insensitive substring search over name, description, brand and
    /// category name. A blank query returns nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{PRODUCT_SELECT} \
             WHERE {LISTABLE} \
               AND (p.name ILIKE $1 OR p.description ILIKE $1 \
                    OR p.brand ILIKE $1 OR c.name ILIKE $1) \
             ORDER BY p.name"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(like_pattern(query))
            .fetch_all(self.pool)
            .await?)
    }

    /// A product by category slug and product slug, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_in_category(
        &self,
        category_slug: &str,
        product_slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE c.slug = $1 AND p.slug = $2");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category_slug)
            .bind(product_slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// A product by slug, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.slug = $1");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Other listable products of the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_products(
        &self,
        category: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT} \
             WHERE {LISTABLE} AND p.category_id = $1 AND p.id <> $2 \
             ORDER BY p.created_at DESC LIMIT $3"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .bind(exclude)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Gallery images of a product by sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        Ok(sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, image, alt_text, sort_order FROM product_images \
             WHERE product_id = $1 ORDER BY sort_order, id",
        )
        .bind(product)
        .fetch_all(self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("iphone"), "%iphone%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
