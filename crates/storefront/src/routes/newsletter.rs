//! Newsletter sign-up from the site footer.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use technova_core::Email;

use crate::db::NewsletterRepository;
use crate::routes::{redirect_error, redirect_success};
use crate::state::AppState;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

/// Subscribe an address. Signing up twice is not an error.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    Form(form): Form<SubscribeForm>,
) -> Redirect {
    let Ok(email) = Email::parse(&form.email) else {
        return redirect_error("/", "invalid_email");
    };

    match NewsletterRepository::new(state.pool()).subscribe(&email).await {
        Ok(true) => {
            tracing::info!("newsletter subscription added");
            redirect_success("/", "newsletter_subscribed")
        }
        Ok(false) => redirect_success("/", "already_subscribed"),
        Err(e) => {
            tracing::error!("Failed to subscribe to newsletter: {e}");
            redirect_error("/", "server")
        }
    }
}
