//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use technova_core::{CheckoutError, PaymentMethod};

use crate::error::{Result, set_sentry_user};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CartOwner, CartView, CurrentUser};
use crate::routes::{Layout, MessageQuery, error_text, redirect_error};
use crate::services::cart::CartService;
use crate::services::checkout::{CheckoutForm, CheckoutService, CheckoutServiceError};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    /// Values to prefill, the previous submission after a failed attempt.
    pub form: CheckoutForm,
}

impl CheckoutTemplate {
    /// Payment radio buttons as `(value, label, checked attribute)`.
    #[must_use]
    pub fn payment_options(&self) -> Vec<(&'static str, &'static str, &'static str)> {
        PaymentMethod::ALL
            .into_iter()
            .map(|method| {
                let checked = if method.as_str() == self.form.payment_method {
                    "checked"
                } else {
                    ""
                };
                (method.as_str(), method.label(), checked)
            })
            .collect()
    }

    /// `checked` attribute of the "billing same as shipping" box.
    #[must_use]
    pub const fn billing_same_checked(&self) -> &'static str {
        if self.form.same_as_shipping.is_some() {
            "checked"
        } else {
            ""
        }
    }
}

/// Empty form for a first visit: contact email from the account, billing
/// same as shipping, card payment.
fn initial_form(user: &CurrentUser) -> CheckoutForm {
    CheckoutForm {
        email: user.email.to_string(),
        same_as_shipping: Some("on".to_owned()),
        payment_method: PaymentMethod::CreditCard.as_str().to_owned(),
        ..CheckoutForm::default()
    }
}

/// Display the checkout form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Response> {
    let cart = CartService::new(state.pool())
        .view(Some(&CartOwner::User(user.id)))
        .await?;
    if cart.is_empty() {
        return Ok(redirect_error("/cart", "empty_cart").into_response());
    }

    let form = initial_form(&user);
    let layout = Layout::load(&state, &session, Some(user), &messages).await;
    Ok(CheckoutTemplate { layout, cart, form }.into_response())
}

/// Place the order.
///
/// Validation and stock failures re-render the form with the submitted
/// values; an empty cart goes back to the cart page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let error = match CheckoutService::new(state.pool())
        .place_order(&user, form.clone())
        .await
    {
        Ok(order) => {
            return Ok(Redirect::to(&format!("{}/success", order.url())).into_response());
        }
        Err(CheckoutServiceError::Checkout(CheckoutError::EmptyCart)) => {
            return Ok(redirect_error("/cart", "empty_cart").into_response());
        }
        Err(CheckoutServiceError::Repository(e)) => return Err(e.into()),
        Err(e) => e,
    };

    tracing::info!(reason = %error, "checkout rejected");
    let message = match &error {
        CheckoutServiceError::Checkout(stock @ CheckoutError::InsufficientStock { .. }) => {
            format!("Sorry, {stock}. Please update your cart.")
        }
        other => error_text(other.code()),
    };

    let cart = CartService::new(state.pool())
        .view(Some(&CartOwner::User(user.id)))
        .await?;
    let layout = Layout::load(&state, &session, Some(user), &MessageQuery::default())
        .await
        .with_error(message);
    Ok(CheckoutTemplate { layout, cart, form }.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use technova_core::{Email, UserId};

    use super::*;

    #[test]
    fn test_initial_form_prefills_account_email() {
        let user = CurrentUser {
            id: UserId::new(3),
            username: "bob".to_owned(),
            email: Email::parse("bob@example.com").unwrap(),
            is_staff: false,
        };
        let form = initial_form(&user);
        assert_eq!(form.email, "bob@example.com");
        assert!(form.same_as_shipping.is_some());
        assert_eq!(form.payment_method, "credit_card");
        assert!(form.shipping_address.is_empty());
    }

    #[test]
    fn test_payment_options_mark_submitted_method() {
        let template = CheckoutTemplate {
            layout: Layout::default(),
            cart: CartView::from_items(Vec::new()),
            form: CheckoutForm {
                payment_method: "paypal".to_owned(),
                ..CheckoutForm::default()
            },
        };
        let checked: Vec<_> = template
            .payment_options()
            .into_iter()
            .filter(|(_, _, checked)| !checked.is_empty())
            .map(|(value, _, _)| value)
            .collect();
        assert_eq!(checked, ["paypal"]);
        assert_eq!(template.billing_same_checked(), "");
    }
}
