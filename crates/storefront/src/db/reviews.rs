//! Review persistence and the rating aggregate on `products`.
//!
//! Every statement that can change which approved reviews exist for a product
//! runs in a transaction that first locks the product row and ends with
//! [`recompute_rating`], so `products.average_rating` and
//! `products.review_count` never lag behind. The lock serializes writers of
//! one product.

use sqlx::{PgConnection, PgPool};

use technova_core::{ProductId, Rating, RatingSummary, ReviewId, UserId};

use super::RepositoryError;
use crate::models::Review;

const REVIEW_SELECT: &str = "\
    SELECT r.id, r.product_id, p.name AS product_name, r.user_id, u.username, r.rating, \
           r.title, r.comment, r.is_verified_purchase, r.is_approved, \
           r.created_at, r.updated_at \
    FROM reviews r \
    JOIN products p ON p.id = r.product_id \
    JOIN users u ON u.id = r.user_id";

/// A review as submitted by its author.
#[derive(Debug, Clone)]
pub struct ReviewSubmission<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub title: &'a str,
    pub comment: &'a str,
    /// Approve right away (moderation off).
    pub approve: bool,
}

/// Whether a submission created a review or replaced the author's old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewWrite {
    Created,
    Updated,
}

/// Lock a product row for the rest of the transaction. False if it is gone.
async fn lock_product(
    conn: &mut PgConnection,
    product: ProductId,
) -> Result<bool, RepositoryError> {
    let locked: Option<ProductId> =
        sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(locked.is_some())
}

/// Recompute a product's rating from its approved reviews and store it.
async fn recompute_rating(
    conn: &mut PgConnection,
    product: ProductId,
) -> Result<RatingSummary, RepositoryError> {
    let raw: Vec<i16> =
        sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1 AND is_approved")
            .bind(product)
            .fetch_all(&mut *conn)
            .await?;

    let ratings = raw
        .into_iter()
        .map(Rating::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
    let summary = RatingSummary::from_ratings(ratings);

    let count = i32::try_from(summary.count)
        .map_err(|_| RepositoryError::DataCorruption(format!("review count {}", summary.count)))?;
    sqlx::query(
        "UPDATE products SET average_rating = $2, review_count = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(product)
    .bind(summary.average)
    .bind(count)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        product_id = %product,
        average = %summary.average,
        count = summary.count,
        "rating recomputed"
    );
    Ok(summary)
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the author's review of a product or replace their existing one.
    ///
    /// The verified-purchase flag is derived from the author's non-cancelled
    /// orders at write time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Database` if any statement fails; neither the review
    /// nor the aggregate is written in either case.
    pub async fn submit(
        &self,
        review: &ReviewSubmission<'_>,
    ) -> Result<ReviewWrite, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !lock_product(&mut tx, review.product_id).await? {
            return Err(RepositoryError::NotFound);
        }

        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO reviews \
                 (product_id, user_id, rating, title, comment, is_verified_purchase, is_approved) \
             VALUES ($1, $2, $3, $4, $5, \
                 EXISTS ( \
                     SELECT 1 FROM order_items oi \
                     JOIN orders o ON o.id = oi.order_id \
                     WHERE o.user_id = $2 AND oi.product_id = $1 AND o.status <> 'cancelled' \
                 ), \
                 $6) \
             ON CONFLICT (product_id, user_id) DO UPDATE \
             SET rating = EXCLUDED.rating, \
                 title = EXCLUDED.title, \
                 comment = EXCLUDED.comment, \
                 is_verified_purchase = EXCLUDED.is_verified_purchase, \
                 is_approved = EXCLUDED.is_approved, \
                 updated_at = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(i16::from(review.rating))
        .bind(review.title.trim())
        .bind(review.comment.trim())
        .bind(review.approve)
        .fetch_one(&mut *tx)
        .await?;

        recompute_rating(&mut tx, review.product_id).await?;
        tx.commit().await?;

        Ok(if inserted {
            ReviewWrite::Created
        } else {
            ReviewWrite::Updated
        })
    }

    /// Delete a review written by `user`. Returns the product it belonged to,
    /// or `None` when the user has no such review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn delete_own(
        &self,
        id: ReviewId,
        user: UserId,
    ) -> Result<Option<ProductId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product: Option<ProductId> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product) = product else {
            return Ok(None);
        };
        lock_product(&mut tx, product).await?;

        let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(None);
        }

        recompute_rating(&mut tx, product).await?;
        tx.commit().await?;
        Ok(Some(product))
    }

    /// Approve a pending review. Returns false for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn approve(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product: Option<ProductId> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product) = product else {
            return Ok(false);
        };
        lock_product(&mut tx, product).await?;

        let approved = sqlx::query(
            "UPDATE reviews SET is_approved = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if approved == 0 {
            return Ok(false);
        }

        recompute_rating(&mut tx, product).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let sql = format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 AND r.is_approved \
             ORDER BY r.created_at DESC, r.id DESC"
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(product)
            .fetch_all(self.pool)
            .await?)
    }

    /// The user's own review of a product, approved or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_user(
        &self,
        product: ProductId,
        user: UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let sql = format!("{REVIEW_SELECT} WHERE r.product_id = $1 AND r.user_id = $2");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(product)
            .bind(user)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Reviews waiting for moderation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending(&self) -> Result<Vec<Review>, RepositoryError> {
        let sql = format!("{REVIEW_SELECT} WHERE NOT r.is_approved ORDER BY r.created_at, r.id");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .fetch_all(self.pool)
            .await?)
    }
}
