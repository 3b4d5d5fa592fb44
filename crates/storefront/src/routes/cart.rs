//! Cart route handlers.
//!
//! Anonymous visitors get a cart keyed by a token in their session; it is
//! merged into the account cart on login.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use technova_core::CartItemId;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CartView;
use crate::routes::{Layout, MessageQuery, redirect_error, redirect_success};
use crate::services::cart::{
    CartService, CartServiceError, current_owner, ensure_owner, parse_quantity_fields,
};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    /// Text so that a blank or garbled field is reported, not rejected with 422.
    #[serde(default)]
    pub quantity: String,
}

impl AddToCartForm {
    /// Requested quantity; blank means one, garbage means zero (rejected).
    fn requested(&self) -> i64 {
        let raw = self.quantity.trim();
        if raw.is_empty() {
            1
        } else {
            raw.parse().unwrap_or(0)
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

fn log_internal(action: &str, e: &CartServiceError) {
    if matches!(e, CartServiceError::Session(_) | CartServiceError::Repository(_)) {
        tracing::error!("Failed to {action}: {e}");
    }
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<CartShowTemplate> {
    let owner = current_owner(&session, user.as_ref()).await;
    let cart = CartService::new(state.pool()).view(owner.as_ref()).await?;

    Ok(CartShowTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        cart,
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session, user, form))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product): Path<String>,
    Form(form): Form<AddToCartForm>,
) -> Redirect {
    let owner = match ensure_owner(&session, user.as_ref()).await {
        Ok(owner) => owner,
        Err(e) => {
            tracing::error!("Failed to create cart key: {e}");
            return redirect_error("/cart", "server");
        }
    };

    match CartService::new(state.pool())
        .add(&owner, &product, form.requested())
        .await
    {
        Ok(added) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product", added.product_name.as_str())]),
            );
            redirect_success("/cart", "added_to_cart")
        }
        Err(e) => {
            log_internal("add to cart", &e);
            redirect_error("/cart", e.code())
        }
    }
}

/// Apply the bulk quantity form.
///
/// Fields are named `quantity_<item_id>`; zero or negative removes the item.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<HashMap<String, String>>,
) -> Redirect {
    let Some(owner) = current_owner(&session, user.as_ref()).await else {
        return Redirect::to("/cart");
    };
    let updates = match parse_quantity_fields(&form) {
        Ok(updates) => updates,
        Err(e) => {
            tracing::info!(reason = %e, "cart update rejected");
            return redirect_error("/cart", CartServiceError::from(e).code());
        }
    };

    match CartService::new(state.pool()).update(&owner, &updates).await {
        Ok(changed) => {
            tracing::debug!(changed, "cart updated");
            redirect_success("/cart", "cart_updated")
        }
        Err(e) => {
            log_internal("update cart", &e);
            redirect_error("/cart", e.code())
        }
    }
}

/// Remove one item from the cart.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(item_id): Path<CartItemId>,
) -> Redirect {
    let owner = current_owner(&session, user.as_ref()).await;

    match CartService::new(state.pool())
        .remove(owner.as_ref(), item_id)
        .await
    {
        Ok(name) => {
            add_breadcrumb("cart", "Removed from cart", Some(&[("product", name.as_str())]));
            redirect_success("/cart", "item_removed")
        }
        Err(e) => {
            log_internal("remove cart item", &e);
            redirect_error("/cart", e.code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_quantity() {
        let form = |q: &str| AddToCartForm {
            quantity: q.to_owned(),
        };
        assert_eq!(form("").requested(), 1);
        assert_eq!(form(" 3 ").requested(), 3);
        assert_eq!(form("-2").requested(), -2);
        assert_eq!(form("lots").requested(), 0);
    }
}
