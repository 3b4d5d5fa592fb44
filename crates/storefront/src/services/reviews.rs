//! Review submission and moderation.

use sqlx::PgPool;
use thiserror::Error;

use technova_core::{Rating, RatingError, ReviewId};

use crate::config::StoreSettings;
use crate::db::reviews::{ReviewSubmission, ReviewWrite};
use crate::db::{CatalogRepository, RepositoryError, ReviewRepository};
use crate::models::{CurrentUser, Product};

/// Maximum review title length.
const MAX_TITLE_LENGTH: usize = 200;

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error("review title is longer than {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,

    #[error("review comment is required")]
    EmptyComment,

    #[error("product not found")]
    ProductNotFound,

    #[error("review not found")]
    ReviewNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ReviewServiceError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Rating(_) => "invalid_rating",
            Self::TitleTooLong => "title_too_long",
            Self::EmptyComment => "empty_comment",
            Self::ProductNotFound => "product_not_found",
            Self::ReviewNotFound => "review_not_found",
            Self::Repository(_) => "server",
        }
    }
}

/// A review form as posted.
#[derive(Debug, Clone, Copy)]
pub struct ReviewInput<'a> {
    pub rating: i64,
    pub title: &'a str,
    pub comment: &'a str,
}

/// Review service.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    catalog: CatalogRepository<'a>,
    settings: &'a StoreSettings,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, settings: &'a StoreSettings) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            catalog: CatalogRepository::new(pool),
            settings,
        }
    }

    /// Create or replace the user's review of a product.
    ///
    /// Returns the product (for redirecting back to it) and whether the
    /// review was created or updated.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input and `ProductNotFound` for
    /// an unknown slug.
    pub async fn submit(
        &self,
        user: &CurrentUser,
        product_slug: &str,
        input: ReviewInput<'_>,
    ) -> Result<(Product, ReviewWrite), ReviewServiceError> {
        let rating = Rating::new(input.rating)?;
        let title = input.title.trim();
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ReviewServiceError::TitleTooLong);
        }
        let comment = input.comment.trim();
        if comment.is_empty() {
            return Err(ReviewServiceError::EmptyComment);
        }

        let product = self
            .catalog
            .product_by_slug(product_slug)
            .await?
            .ok_or(ReviewServiceError::ProductNotFound)?;

        let write = self
            .reviews
            .submit(&ReviewSubmission {
                product_id: product.id,
                user_id: user.id,
                rating,
                title,
                comment,
                approve: !self.settings.review_moderation,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ReviewServiceError::ProductNotFound,
                other => other.into(),
            })?;

        tracing::info!(
            product_id = %product.id,
            user_id = %user.id,
            rating = rating.value(),
            ?write,
            moderated = self.settings.review_moderation,
            "review saved"
        );
        Ok((product, write))
    }

    /// Delete one of the user's own reviews.
    ///
    /// # Errors
    ///
    /// Returns `ReviewNotFound` when the review is not the user's.
    pub async fn delete_own(
        &self,
        user: &CurrentUser,
        id: ReviewId,
    ) -> Result<(), ReviewServiceError> {
        let product = self
            .reviews
            .delete_own(id, user.id)
            .await?
            .ok_or(ReviewServiceError::ReviewNotFound)?;
        tracing::info!(review_id = %id, product_id = %product, "review deleted");
        Ok(())
    }

    /// Approve a pending review (staff).
    ///
    /// # Errors
    ///
    /// Returns `ReviewNotFound` for an unknown id.
    pub async fn approve(&self, id: ReviewId) -> Result<(), ReviewServiceError> {
        if !self.reviews.approve(id).await? {
            return Err(ReviewServiceError::ReviewNotFound);
        }
        tracing::info!(review_id = %id, "review approved");
        Ok(())
    }
}
