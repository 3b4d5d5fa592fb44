//! Staff account management.
//!
//! Staff accounts are ordinary users with `is_staff` set; they log in
//! through the storefront and land on `/admin`.

use technova_core::Email;
use technova_storefront::db::UserRepository;
use technova_storefront::db::users::NewUser;
use technova_storefront::services::auth::{hash_password, validate_password, validate_username};

use super::{CommandError, connect};

/// Create an active staff account, or promote the existing account that
/// owns `email`.
///
/// # Errors
///
/// Returns an error for an invalid username, email or password, for a
/// username owned by another account, or if the database fails.
pub async fn create(username: &str, email: &str, password: &str) -> Result<(), CommandError> {
    let username = validate_username(username)?;
    let email = Email::parse(email)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        users.promote_to_staff(&email).await?;
        tracing::info!(
            user_id = %existing.id,
            username = %existing.username,
            "Existing account promoted to staff (password unchanged)"
        );
        return Ok(());
    }

    if users.username_exists(username).await? {
        return Err(CommandError::UsernameTaken(username.to_owned()));
    }

    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = users
        .create(&NewUser {
            username,
            email: &email,
            first_name: "",
            last_name: "",
            password_hash: &password_hash,
            is_active: true,
            is_staff: true,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, email = %user.email, "Staff account created");
    Ok(())
}
