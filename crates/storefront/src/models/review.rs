//! Product reviews.

use chrono::{DateTime, Utc};

use technova_core::{ProductId, Rating, ReviewId, UserId};

/// A review joined with its author's username and the product name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub product_name: String,
    pub user_id: UserId,
    pub username: String,
    #[sqlx(try_from = "i16")]
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
