//! Authentication route handlers.
//!
//! Handles login, registration, email verification and logout for local
//! password accounts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::User;
use crate::routes::{Layout, MessageQuery, error_text, redirect_error, redirect_success};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::services::cart::CartService;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email address.
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Resend verification form data.
#[derive(Debug, Deserialize)]
pub struct ResendForm {
    pub email: String,
}

/// `?next=` on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    /// Previous submission, passwords cleared.
    pub form: RegisterForm,
}

/// Registration success page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub layout: Layout,
}

/// Resend verification page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/resend.html")]
pub struct ResendTemplate {
    pub layout: Layout,
}

/// A local path to return to after login, or `None` for anything that could
/// leave the site.
fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}

/// Put the user in the session and fold their anonymous cart in.
async fn start_session(
    state: &AppState,
    session: &Session,
    user: &User,
) -> Result<(), AppError> {
    // Read the visitor's cart key before the session id is cycled.
    CartService::new(state.pool())
        .merge_on_login(session, user.id)
        .await?;
    set_current_user(session, &user.to_current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(next): Query<NextQuery>,
    Query(messages): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        layout: Layout::load(&state, &session, None, &messages).await,
        next: next.next.unwrap_or_default(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// Staff land on the dashboard; everyone else on `next` or the home page.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.pool(), state.config());

    match auth.login(&form.username, &form.password).await {
        Ok(user) => {
            if let Err(e) = start_session(&state, &session, &user).await {
                tracing::error!("Failed to start session: {e}");
                return redirect_error("/auth/login", "server").into_response();
            }
            tracing::info!(user_id = %user.id, staff = user.is_staff, "user logged in");

            if user.is_staff {
                Redirect::to("/admin").into_response()
            } else {
                let target = safe_next(&form.next).unwrap_or("/");
                redirect_success(target, "logged_in").into_response()
            }
        }
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Login failed: {e}");
            } else {
                tracing::warn!(reason = %e, "login rejected");
            }
            redirect_error("/auth/login", e.code()).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip_all)]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> RegisterTemplate {
    RegisterTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        form: RegisterForm::default(),
    }
}

/// Handle registration form submission.
///
/// The account stays inactive until the emailed link is followed; errors
/// re-render the form with what was typed.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let auth = AuthService::new(state.pool(), state.config());
    let registration = Registration {
        username: &form.username,
        email: &form.email,
        first_name: &form.first_name,
        last_name: &form.last_name,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };

    match auth.register(&registration).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "account registered");
            Redirect::to("/auth/register/success").into_response()
        }
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Registration failed: {e}");
            } else {
                tracing::info!(reason = %e, "registration rejected");
            }
            let layout = Layout::load(&state, &session, None, &MessageQuery::default())
                .await
                .with_error(error_text(e.code()));
            RegisterTemplate {
                layout,
                form: RegisterForm {
                    password: String::new(),
                    password_confirm: String::new(),
                    ..form
                },
            }
            .into_response()
        }
    }
}

/// Display the "check your email" page.
#[instrument(skip_all)]
pub async fn register_success(
    State(state): State<AppState>,
    session: Session,
) -> RegisterSuccessTemplate {
    RegisterSuccessTemplate {
        layout: Layout::load(&state, &session, None, &MessageQuery::default()).await,
    }
}

// =============================================================================
// Verification Routes
// =============================================================================

/// Follow a verification link: activate the account and log it in.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Response {
    let Ok(token) = Uuid::parse_str(token.trim()) else {
        return redirect_error("/auth/register", "verification_invalid").into_response();
    };

    let auth = AuthService::new(state.pool(), state.config());
    match auth.verify(token).await {
        Ok(user) => {
            if let Err(e) = start_session(&state, &session, &user).await {
                tracing::error!("Failed to start session after verification: {e}");
                return redirect_error("/auth/login", "server").into_response();
            }
            redirect_success("/", "verified").into_response()
        }
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Verification failed: {e}");
            }
            redirect_error("/auth/register", e.code()).into_response()
        }
    }
}

/// Display the resend verification form.
#[instrument(skip_all)]
pub async fn resend_page(
    State(state): State<AppState>,
    session: Session,
    Query(messages): Query<MessageQuery>,
) -> ResendTemplate {
    ResendTemplate {
        layout: Layout::load(&state, &session, None, &messages).await,
    }
}

/// Issue a fresh verification link.
///
/// Unknown addresses get the same answer as pending ones, so the form cannot
/// reveal which addresses have accounts.
#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    Form(form): Form<ResendForm>,
) -> Redirect {
    let auth = AuthService::new(state.pool(), state.config());

    match auth.resend_verification(&form.email).await {
        Ok(()) | Err(AuthError::UserNotFound) => {
            redirect_success("/auth/verify/resend", "verification_sent")
        }
        Err(AuthError::AlreadyActive) => redirect_error("/auth/login", "already_active"),
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Failed to resend verification: {e}");
            }
            redirect_error("/auth/verify/resend", e.code())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();
    redirect_success("/", "logged_out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/orders"), Some("/orders"));
        assert_eq!(safe_next(" /checkout "), Some("/checkout"));
        assert_eq!(safe_next(""), None);
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("https://evil.example"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
    }
}
