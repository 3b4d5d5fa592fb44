//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] technova_core::EmailError),

    /// Username empty, too long, or with characters outside `[A-Za-z0-9@.+_-]`.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// First or last name longer than the column allows.
    #[error("name is too long")]
    NameTooLong,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email is not verified yet.
    #[error("account is not active")]
    InactiveAccount,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// The account is already verified.
    #[error("account already active")]
    AlreadyActive,

    #[error("username already taken")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("verification link expired")]
    VerificationExpired,

    #[error("verification link invalid")]
    VerificationUnknown,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidUsername(_) => "invalid_username",
            Self::NameTooLong => "name_too_long",
            Self::InvalidCredentials | Self::UserNotFound => "credentials",
            Self::InactiveAccount => "inactive",
            Self::AlreadyActive => "already_active",
            Self::UsernameTaken => "username_taken",
            Self::EmailTaken => "email_taken",
            Self::PasswordMismatch => "password_mismatch",
            Self::WeakPassword(_) => "weak_password",
            Self::VerificationExpired => "verification_expired",
            Self::VerificationUnknown => "verification_invalid",
            Self::Repository(_) | Self::PasswordHash => "server",
        }
    }

    /// Whether this is a server-side failure rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
