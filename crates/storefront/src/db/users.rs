//! User repository for database operations.
//!
//! Accounts and their email verification tokens.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use technova_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active, is_staff, \
                            date_joined, last_login";

/// Name of the case-insensitive unique index on `users.username`.
const USERNAME_INDEX: &str = "users_username_lower_idx";

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub is_staff: bool,
}

/// Result of following a verification link.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// The account is now active.
    Verified(User),
    /// The token existed but is past its expiry; it has been removed.
    Expired,
    /// No such token.
    Unknown,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    user_id: UserId,
    expires_at: chrono::DateTime<Utc>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Look up a user and password hash by email or username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_login_record(
        &self,
        identifier: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users \
             WHERE email = LOWER($1) OR LOWER(username) = LOWER($1) \
             ORDER BY (email = LOWER($1)) DESC \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, LoginRow>(&sql)
            .bind(identifier.trim())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Whether a username is taken (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether an email is registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("username")` or
    /// `RepositoryError::Conflict("email")` when either is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users \
                 (username, email, first_name, last_name, password_hash, is_active, is_staff) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.first_name)
            .bind(new.last_name)
            .bind(new.password_hash)
            .bind(new.is_active)
            .bind(new.is_staff)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    let what = if db_err.constraint() == Some(USERNAME_INDEX) {
                        "username"
                    } else {
                        "email"
                    };
                    return RepositoryError::Conflict(what.to_owned());
                }
                RepositoryError::Database(e)
            })
    }

    /// Promote an existing account to staff and activate it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    pub async fn promote_to_staff(&self, email: &Email) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET is_staff = TRUE, is_active = TRUE WHERE email = $1")
                .bind(email)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Create (or replace) the verification token of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn issue_verification_token(
        &self,
        user_id: UserId,
        ttl: Duration,
    ) -> Result<Uuid, RepositoryError> {
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + ttl;
        sqlx::query(
            "INSERT INTO email_verification_tokens (token, user_id, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET token = EXCLUDED.token, created_at = NOW(), expires_at = EXCLUDED.expires_at",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(token)
    }

    /// Consume a verification token, activating its user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back.
    pub async fn consume_verification_token(
        &self,
        token: Uuid,
    ) -> Result<VerifyOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT user_id, expires_at FROM email_verification_tokens \
             WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(VerifyOutcome::Unknown);
        };

        sqlx::query("DELETE FROM email_verification_tokens WHERE token = $1")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        if row.expires_at < Utc::now() {
            tx.commit().await?;
            return Ok(VerifyOutcome::Expired);
        }

        let sql = format!("UPDATE users SET is_active = TRUE WHERE id = $1 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(row.user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(VerifyOutcome::Verified(user))
    }
}
