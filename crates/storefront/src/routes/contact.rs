//! Contact page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::ContactSubject;
use crate::routes::{Layout, MessageQuery, error_text, redirect_success};
use crate::services::contact::{ContactForm, ContactService};
use crate::state::AppState;

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
    /// Values to prefill, the previous submission after a failed attempt.
    pub form: ContactForm,
}

impl ContactTemplate {
    /// Subject options as `(value, label, selected attribute)`.
    #[must_use]
    pub fn subject_options(&self) -> Vec<(&'static str, &'static str, &'static str)> {
        ContactSubject::ALL
            .into_iter()
            .map(|subject| {
                let selected = if subject.as_str() == self.form.subject {
                    "selected"
                } else {
                    ""
                };
                (subject.as_str(), subject.label(), selected)
            })
            .collect()
    }
}

/// Display the contact form.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> ContactTemplate {
    let form = ContactForm::for_user(user.as_ref());
    ContactTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        form,
    }
}

/// Store a contact message.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<ContactForm>,
) -> Response {
    match ContactService::new(state.pool()).submit(&form).await {
        Ok(_) => redirect_success("/contact", "message_sent").into_response(),
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Failed to store contact message: {e}");
            } else {
                tracing::info!(reason = %e, "contact message rejected");
            }
            let layout = Layout::load(&state, &session, user, &MessageQuery::default())
                .await
                .with_error(error_text(e.code()));
            ContactTemplate { layout, form }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_options_mark_submitted_subject() {
        let template = ContactTemplate {
            layout: Layout::default(),
            form: ContactForm {
                subject: "billing".to_owned(),
                ..ContactForm::default()
            },
        };
        let options = template.subject_options();
        assert_eq!(options.len(), ContactSubject::ALL.len());
        let selected: Vec<_> = options
            .into_iter()
            .filter(|(_, _, selected)| !selected.is_empty())
            .map(|(value, _, _)| value)
            .collect();
        assert_eq!(selected, ["billing"]);
    }
}
