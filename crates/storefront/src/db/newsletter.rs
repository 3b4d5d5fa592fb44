//! Newsletter subscribers.

use sqlx::PgPool;

use technova_core::Email;

use super::RepositoryError;

/// Repository for newsletter sign-ups.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    /// Returns false if it was already an active subscriber.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn subscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO newsletter_subscribers (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE \
             SET is_active = TRUE, subscribed_at = NOW(), unsubscribed_at = NULL \
             WHERE NOT newsletter_subscribers.is_active",
        )
        .bind(email)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
