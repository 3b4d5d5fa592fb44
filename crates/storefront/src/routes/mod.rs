//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page
//!
//! # Catalog
//! GET  /products                          - All products
//! GET  /products/sale                     - Products on sale
//! GET  /search?q=                         - Search
//! GET  /categories/{category}             - Category page
//! GET  /categories/{category}/{product}   - Product detail
//!
//! # Reviews (requires auth)
//! POST /products/{product}/reviews        - Create or replace own review
//! POST /reviews/{id}/delete               - Delete own review
//!
//! # Cart
//! GET  /cart                              - Cart page
//! POST /cart/add/{product}                - Add (form: quantity)
//! POST /cart/update                       - Bulk update (quantity_<id> fields)
//! POST /cart/remove/{item_id}             - Remove one item
//!
//! # Checkout and orders (requires auth)
//! GET  /checkout                          - Checkout form
//! POST /checkout/confirm                  - Place order
//! GET  /orders                            - Order history (?page=)
//! GET  /orders/{number}                   - Order detail
//! GET  /orders/{number}/success           - Confirmation page
//! POST /orders/{number}/cancel            - Cancel
//!
//! # Wishlist and account (requires auth)
//! GET  /wishlist                          - Wishlist
//! POST /wishlist/add/{product}            - Add
//! POST /wishlist/remove/{id}              - Remove
//! GET  /account                           - Account dashboard
//!
//! # Auth
//! GET  /auth/login                        - Login page
//! POST /auth/login                        - Login action
//! GET  /auth/register                     - Register page
//! POST /auth/register                     - Register action
//! GET  /auth/register/success             - "Check your email" page
//! GET  /auth/verify/{token}               - Verify email and log in
//! GET  /auth/verify/resend                - Resend form
//! POST /auth/verify/resend                - Resend action
//! POST /auth/logout                       - Logout action
//!
//! # Site forms
//! GET  /contact                           - Contact form
//! POST /contact                           - Send a contact message
//! POST /newsletter/subscribe              - Newsletter sign-up (form: email)
//!
//! # Admin (requires staff)
//! GET  /admin                             - Dashboard
//! GET  /admin/products                    - Product list
//! GET  /admin/users                       - User list
//! GET  /admin/orders                      - Order list
//! GET  /admin/reviews                     - Pending reviews
//! POST /admin/orders/{number}/status      - Move an order along its lifecycle
//! POST /admin/reviews/{id}/approve        - Approve a review
//! ```
//!
//! Form handlers answer with a redirect carrying `?error=<code>` or
//! `?success=<code>`; [`Layout`] turns the code into the banner text.

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;

use std::sync::Arc;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::CartRepository;
use crate::middleware::{auth_rate_limiter, form_rate_limiter, rate_limit::RateLimiterLayer};
use crate::models::{Category, CurrentUser};
use crate::services::cart::current_owner;
use crate::state::AppState;

// =============================================================================
// Flash Messages
// =============================================================================

/// `?error=` / `?success=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// `?page=` query parameter of list pages.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

const ERROR_MESSAGES: &[(&str, &str)] = &[
    ("invalid_quantity", "Quantity must be at least 1."),
    ("quantity_too_large", "That quantity is more than we can put in one cart line."),
    ("product_not_found", "That product no longer exists."),
    ("product_unavailable", "That product is not available right now."),
    ("item_not_found", "That item is not in your cart."),
    ("empty_cart", "Your cart is empty."),
    ("insufficient_stock", "Some items in your cart are no longer in stock."),
    ("invalid_email", "Please enter a valid email address."),
    ("phone_too_long", "Phone numbers are limited to 20 characters."),
    ("name_too_long", "First and last names are limited to 150 characters."),
    ("tracking_too_long", "Tracking numbers are limited to 100 characters."),
    ("invalid_name", "Please enter your name using letters, spaces, apostrophes and hyphens."),
    ("contact_name_too_long", "Names are limited to 100 characters."),
    ("invalid_phone", "Phone numbers may contain digits, spaces, +, - and parentheses only."),
    ("invalid_subject", "Please choose a subject."),
    ("empty_message", "Please write a message."),
    ("message_too_long", "Messages are limited to 2000 characters."),
    ("shipping_address", "Please enter your shipping address and city."),
    ("billing_address", "Please enter your billing address and city."),
    ("payment_method", "Please choose a payment method."),
    ("invalid_username", "Usernames may contain letters, digits and @ . + - _ only."),
    ("credentials", "Invalid username/email or password."),
    ("inactive", "Please verify your email address before logging in."),
    ("already_active", "That account is already verified. Please log in."),
    ("username_taken", "That username is already taken."),
    ("email_taken", "An account with that email already exists."),
    ("password_mismatch", "The passwords do not match."),
    ("weak_password", "Passwords need at least 8 characters, a letter and a digit."),
    ("verification_expired", "That verification link has expired. Request a new one below."),
    ("verification_invalid", "That verification link is not valid."),
    ("invalid_rating", "Please pick a rating from 1 to 5 stars."),
    ("title_too_long", "Review titles are limited to 200 characters."),
    ("empty_comment", "Please write a comment for your review."),
    ("review_not_found", "That review does not exist."),
    ("order_not_found", "That order does not exist."),
    ("not_cancellable", "This order can no longer be cancelled."),
    ("invalid_transition", "That status change is not allowed for this order."),
    ("invalid_status", "Unknown order status."),
    ("wishlist_not_found", "That item is not in your wishlist."),
    ("server", "Something went wrong on our side. Please try again."),
];

const SUCCESS_MESSAGES: &[(&str, &str)] = &[
    ("added_to_cart", "Added to your cart."),
    ("cart_updated", "Cart updated."),
    ("item_removed", "Item removed from your cart."),
    ("review_created", "Thanks for your review!"),
    ("review_updated", "Your review has been updated."),
    ("review_pending", "Thanks! Your review will appear once it has been approved."),
    ("review_deleted", "Your review has been deleted."),
    ("review_approved", "Review approved."),
    ("order_cancelled", "Your order has been cancelled."),
    ("status_updated", "Order status updated."),
    ("wishlist_added", "Added to your wishlist."),
    ("already_in_wishlist", "That product is already in your wishlist."),
    ("wishlist_removed", "Removed from your wishlist."),
    ("verification_sent", "If that account is waiting for verification, a new link is on its way."),
    ("verified", "Your email is verified. Welcome to TechNova!"),
    ("logged_in", "Welcome back!"),
    ("logged_out", "You have been logged out."),
    ("newsletter_subscribed", "Thanks for subscribing to our newsletter!"),
    ("already_subscribed", "You are already subscribed to our newsletter."),
    ("message_sent", "Your message has been sent. We will get back to you soon."),
];

fn lookup(table: &[(&str, &'static str)], code: Option<&str>) -> Option<String> {
    let code = code?;
    table
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, text)| (*text).to_owned())
}

/// Banner text for an error code, for pages re-rendered in place.
#[must_use]
pub fn error_text(code: &str) -> String {
    lookup(ERROR_MESSAGES, Some(code))
        .or_else(|| lookup(ERROR_MESSAGES, Some("server")))
        .unwrap_or_default()
}

/// Redirect to `path` with `?error=<code>`.
#[must_use]
pub fn redirect_error(path: &str, code: &str) -> Redirect {
    redirect_with(path, "error", code)
}

/// Redirect to `path` with `?success=<code>`.
#[must_use]
pub fn redirect_success(path: &str, code: &str) -> Redirect {
    redirect_with(path, "success", code)
}

fn redirect_with(path: &str, key: &str, code: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{key}={}",
        urlencoding::encode(code)
    ))
}

// =============================================================================
// Page Layout
// =============================================================================

/// Data every full page renders: navigation, header badges and the banner.
#[derive(Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub categories: Arc<Vec<Category>>,
    /// Units in the visitor's cart.
    pub cart_count: i64,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Layout {
    /// Load the layout for a request. Navigation and badge failures are
    /// logged and rendered as empty rather than failing the page.
    pub async fn load(
        state: &AppState,
        session: &Session,
        user: Option<CurrentUser>,
        messages: &MessageQuery,
    ) -> Self {
        let categories = state.top_level_categories().await.unwrap_or_else(|e| {
            tracing::error!("Failed to load navigation categories: {e}");
            Arc::new(Vec::new())
        });

        let cart_count = match current_owner(session, user.as_ref()).await {
            Some(owner) => CartRepository::new(state.pool())
                .unit_count(&owner)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to count cart units: {e}");
                    0
                }),
            None => 0,
        };

        Self {
            user,
            categories,
            cart_count,
            error: lookup(ERROR_MESSAGES, messages.error.as_deref()),
            success: lookup(SUCCESS_MESSAGES, messages.success.as_deref()),
        }
    }

    /// Replace the banner with an error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.success = None;
        self
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/products", get(products::all))
        .route("/products/sale", get(products::sale))
        .route("/search", get(products::search))
        .route("/categories/{category}", get(products::category))
        .route("/categories/{category}/{product}", get(products::detail))
}

/// Create the review routes router.
pub fn review_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route("/products/{product}/reviews", post(reviews::submit))
        .route("/reviews/{id}/delete", post(reviews::delete))
        .route_layer(limiter)
}

/// Create the cart routes router.
pub fn cart_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let actions = Router::new()
        .route("/add/{product}", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove/{item_id}", post(cart::remove))
        .route_layer(limiter);

    Router::new().route("/", get(cart::show)).merge(actions)
}

/// Create the checkout and order routes router.
pub fn order_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let actions = Router::new()
        .route("/checkout/confirm", post(checkout::confirm))
        .route("/orders/{number}/cancel", post(orders::cancel))
        .route_layer(limiter);

    Router::new()
        .route("/checkout", get(checkout::show))
        .route("/orders", get(orders::index))
        .route("/orders/{number}", get(orders::show))
        .route("/orders/{number}/success", get(orders::success))
        .merge(actions)
}

/// Create the wishlist routes router.
pub fn wishlist_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let actions = Router::new()
        .route("/add/{product}", post(wishlist::add))
        .route("/remove/{id}", post(wishlist::remove))
        .route_layer(limiter);

    Router::new().route("/", get(wishlist::index)).merge(actions)
}

/// Create the auth routes router. Credential-bearing posts share the strict
/// limiter.
pub fn auth_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let actions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/verify/resend", post(auth::resend_verification))
        .route_layer(limiter);

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/register/success", get(auth::register_success))
        .route("/verify/resend", get(auth::resend_page))
        .route("/verify/{token}", get(auth::verify))
        .route("/logout", post(auth::logout))
        .merge(actions)
}

/// Create the contact and newsletter routes router.
pub fn site_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let actions = Router::new()
        .route("/contact", post(contact::submit))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route_layer(limiter);

    Router::new().route("/contact", get(contact::show)).merge(actions)
}

/// Create the staff dashboard router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/products", get(admin::products))
        .route("/users", get(admin::users))
        .route("/orders", get(admin::orders))
        .route("/orders/{number}/status", post(admin::update_status))
        .route("/reviews", get(admin::reviews))
        .route("/reviews/{id}/approve", post(admin::approve_review))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let forms = form_rate_limiter();

    Router::new()
        .merge(catalog_routes())
        .merge(review_routes(forms.clone()))
        .nest("/cart", cart_routes(forms.clone()))
        .merge(order_routes(forms.clone()))
        .nest("/wishlist", wishlist_routes(forms.clone()))
        .merge(site_routes(forms))
        .route("/account", get(account::index))
        .nest("/auth", auth_routes(auth_rate_limiter()))
        .nest("/admin", admin_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        response.headers()["location"].to_str().unwrap().to_owned()
    }

    #[test]
    fn test_redirect_with_codes() {
        assert_eq!(location(redirect_error("/cart", "empty_cart")), "/cart?error=empty_cart");
        assert_eq!(
            location(redirect_success("/orders?page=2", "order_cancelled")),
            "/orders?page=2&success=order_cancelled"
        );
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        assert_eq!(
            lookup(ERROR_MESSAGES, Some("empty_cart")).as_deref(),
            Some("Your cart is empty.")
        );
        assert!(lookup(ERROR_MESSAGES, Some("<script>")).is_none());
        assert!(lookup(SUCCESS_MESSAGES, None).is_none());
    }

    #[test]
    fn test_every_service_code_has_text() {
        use crate::services::auth::AuthError;
        use crate::services::cart::CartServiceError;
        use crate::services::checkout::CheckoutServiceError;
        use crate::services::contact::ContactError;
        use crate::services::reviews::ReviewServiceError;

        let codes = [
            AuthError::InvalidCredentials.code(),
            AuthError::InactiveAccount.code(),
            AuthError::VerificationExpired.code(),
            AuthError::VerificationUnknown.code(),
            AuthError::NameTooLong.code(),
            CartServiceError::ItemNotFound.code(),
            CartServiceError::ProductNotFound.code(),
            CheckoutServiceError::IncompleteShipping.code(),
            CheckoutServiceError::IncompleteBilling.code(),
            CheckoutServiceError::PhoneTooLong.code(),
            ContactError::EmptyName.code(),
            ContactError::NameTooLong.code(),
            ContactError::InvalidPhone.code(),
            ContactError::UnknownSubject(String::new()).code(),
            ContactError::EmptyMessage.code(),
            ContactError::MessageTooLong.code(),
            ReviewServiceError::EmptyComment.code(),
            ReviewServiceError::TitleTooLong.code(),
        ];
        for code in codes {
            assert!(lookup(ERROR_MESSAGES, Some(code)).is_some(), "{code}");
        }
    }

    #[test]
    fn test_site_form_outcomes_have_text() {
        for code in ["newsletter_subscribed", "already_subscribed", "message_sent"] {
            assert!(lookup(SUCCESS_MESSAGES, Some(code)).is_some(), "{code}");
        }
        assert!(error_text("message_too_long").contains("2000"));
    }
}
