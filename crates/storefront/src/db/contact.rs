//! Contact form messages.

use sqlx::PgPool;

use technova_core::{ContactMessageId, Email};

use super::RepositoryError;
use crate::models::ContactSubject;

/// A validated contact message ready to store.
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub subject: ContactSubject,
    pub message: String,
}

/// Repository for contact messages.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        message: &NewContactMessage,
    ) -> Result<ContactMessageId, RepositoryError> {
        Ok(sqlx::query_scalar(
            "INSERT INTO contact_messages (name, email, phone, subject, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(message.subject)
        .bind(&message.message)
        .fetch_one(self.pool)
        .await?)
    }
}
