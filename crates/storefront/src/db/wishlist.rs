//! Wishlist persistence.

use sqlx::PgPool;

use technova_core::{ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use crate::models::WishlistEntry;

/// Repository for wishlist items.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save a product. Returns false if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user)
        .bind(product)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove one of the user's entries, returning the product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry is not the user's.
    pub async fn remove(
        &self,
        user: UserId,
        id: WishlistItemId,
    ) -> Result<String, RepositoryError> {
        let name: Option<String> = sqlx::query_scalar(
            "DELETE FROM wishlist_items w USING products p \
             WHERE w.id = $1 AND w.user_id = $2 AND p.id = w.product_id \
             RETURNING p.name",
        )
        .bind(id)
        .bind(user)
        .fetch_optional(self.pool)
        .await?;
        name.ok_or(RepositoryError::NotFound)
    }

    /// The user's saved products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        Ok(sqlx::query_as::<_, WishlistEntry>(
            "SELECT w.id, w.product_id, p.name AS product_name, p.slug AS product_slug, \
                    c.slug AS category_slug, p.primary_image, p.price, w.created_at \
             FROM wishlist_items w \
             JOIN products p ON p.id = w.product_id \
             JOIN categories c ON c.id = p.category_id \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at DESC, w.id DESC",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?)
    }

    /// Number of saved products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user: UserId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM wishlist_items WHERE user_id = $1")
                .bind(user)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
