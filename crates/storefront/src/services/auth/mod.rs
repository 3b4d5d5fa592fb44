//! Authentication service.
//!
//! Password accounts with email verification. New accounts stay inactive
//! until the link logged at registration is followed.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use uuid::Uuid;

use technova_core::Email;

use crate::config::StorefrontConfig;
use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository, VerifyOutcome};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 150;

/// Maximum first or last name length.
const MAX_NAME_LENGTH: usize = 150;

/// Registration form input.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    config: &'a StorefrontConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a StorefrontConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            config,
        }
    }

    /// Register an inactive account and issue its verification token.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input, `UsernameTaken` or
    /// `EmailTaken` on duplicates, `Repository` for database failures.
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        let username = validate_username(form.username)?;
        let email = Email::parse(form.email)?;
        let first_name = validate_name(form.first_name)?;
        let last_name = validate_name(form.last_name)?;

        if form.password != form.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(form.password)?;

        if self.users.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(form.password)?;
        let user = self
            .users
            .create(&NewUser {
                username,
                email: &email,
                first_name,
                last_name,
                password_hash: &password_hash,
                is_active: false,
                is_staff: false,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(what) if what == "username" => AuthError::UsernameTaken,
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        self.send_verification(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "account registered");
        Ok(user)
    }

    /// Issue a fresh verification token and log the link.
    async fn send_verification(&self, user: &User) -> Result<Uuid, AuthError> {
        let ttl = chrono::Duration::hours(self.config.store.verification_ttl_hours);
        let token = self.users.issue_verification_token(user.id, ttl).await?;
        let link = self.verification_url(token);
        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            verification_url = %link,
            "verification link issued"
        );
        Ok(token)
    }

    /// Absolute verification URL for a token.
    #[must_use]
    pub fn verification_url(&self, token: Uuid) -> String {
        self.config.absolute_url(&format!("/auth/verify/{token}"))
    }

    /// Replace the verification token of an inactive account.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown email and `AlreadyActive` when
    /// there is nothing to verify.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.is_active {
            return Err(AuthError::AlreadyActive);
        }
        self.send_verification(&user).await?;
        Ok(())
    }

    /// Follow a verification link.
    ///
    /// # Errors
    ///
    /// Returns `VerificationExpired` or `VerificationUnknown` for stale or
    /// made-up tokens.
    pub async fn verify(&self, token: Uuid) -> Result<User, AuthError> {
        match self.users.consume_verification_token(token).await? {
            VerifyOutcome::Verified(user) => {
                tracing::info!(user_id = %user.id, "email verified");
                Ok(user)
            }
            VerifyOutcome::Expired => Err(AuthError::VerificationExpired),
            VerifyOutcome::Unknown => Err(AuthError::VerificationUnknown),
        }
    }

    /// Login with email or username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the identifier or password
    /// is wrong and `AuthError::InactiveAccount` for unverified accounts.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_login_record(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InactiveAccount);
        }

        self.users.record_login(user.id).await?;
        Ok(user)
    }
}

/// Check a username against the allowed characters and length.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` describing the first problem found.
pub fn validate_username(raw: &str) -> Result<&str, AuthError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AuthError::InvalidUsername(
            "letters, digits and @/./+/-/_ only".to_owned(),
        ));
    }
    Ok(username)
}

/// Trim an optional first or last name and check its length.
///
/// # Errors
///
/// Returns `AuthError::NameTooLong` above the column width.
pub fn validate_name(raw: &str) -> Result<&str, AuthError> {
    let name = raw.trim();
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::NameTooLong);
    }
    Ok(name)
}

/// Check the password policy: length and a letter plus a digit.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` when the policy is not met.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AuthError::WeakPassword(
            "password must contain a letter and a digit".to_owned(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
