//! Cart service.
//!
//! Resolves whose cart a request works on (the logged-in user, or the
//! anonymous cart key kept in the session) and applies the cart rules from
//! `technova_core::cart` before touching the database.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use uuid::Uuid;

use technova_core::{CartError, CartItemId, QuantityUpdate, UserId, validate_add_quantity};

use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::models::{CartOwner, CartView, CurrentUser, session_keys};

/// Form field prefix of the bulk update form.
const QUANTITY_FIELD_PREFIX: &str = "quantity_";

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("product not found")]
    ProductNotFound,

    /// Product exists but is not `active`.
    #[error("{0} is not available")]
    ProductUnavailable(String),

    #[error("cart item not found")]
    ItemNotFound,

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CartServiceError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cart(CartError::NonPositiveQuantity) => "invalid_quantity",
            Self::Cart(CartError::QuantityTooLarge { .. }) => "quantity_too_large",
            Self::ProductNotFound => "product_not_found",
            Self::ProductUnavailable(_) => "product_unavailable",
            Self::ItemNotFound => "item_not_found",
            Self::Session(_) | Self::Repository(_) => "server",
        }
    }
}

/// Outcome of adding to the cart.
#[derive(Debug, Clone)]
pub struct Added {
    pub product_name: String,
    /// Line quantity after the add.
    pub quantity: u32,
}

/// The cart owner for a request, if it has one yet.
///
/// Logged-in users own their cart by id. Visitors own the cart whose key is
/// stored in their session.
pub async fn current_owner(session: &Session, user: Option<&CurrentUser>) -> Option<CartOwner> {
    if let Some(user) = user {
        return Some(CartOwner::User(user.id));
    }
    session
        .get::<String>(session_keys::CART_KEY)
        .await
        .ok()
        .flatten()
        .map(CartOwner::Session)
}

/// The cart owner for a request, minting an anonymous cart key if needed.
///
/// # Errors
///
/// Returns the session error if the key cannot be stored.
pub async fn ensure_owner(
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<CartOwner, tower_sessions::session::Error> {
    if let Some(owner) = current_owner(session, user).await {
        return Ok(owner);
    }
    let key = Uuid::new_v4().to_string();
    session.insert(session_keys::CART_KEY, &key).await?;
    Ok(CartOwner::Session(key))
}

/// Parse the `quantity_<item_id>` fields of the bulk update form.
///
/// Fields whose id or value does not parse are skipped.
///
/// # Errors
///
/// Returns [`CartError::QuantityTooLarge`] if any value is above the line
/// limit; no update is applied in that case.
pub fn parse_quantity_fields(
    form: &HashMap<String, String>,
) -> Result<Vec<(CartItemId, QuantityUpdate)>, CartError> {
    let mut updates = Vec::new();
    for (key, value) in form {
        let Some(id) = key
            .strip_prefix(QUANTITY_FIELD_PREFIX)
            .and_then(|id| id.parse::<i32>().ok())
        else {
            continue;
        };
        let Ok(quantity) = value.trim().parse::<i64>() else {
            continue;
        };
        updates.push((CartItemId::new(id), QuantityUpdate::from_requested(quantity)?));
    }
    updates.sort_by_key(|(id, _)| id.as_i32());
    Ok(updates)
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    catalog: CatalogRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            catalog: CatalogRepository::new(pool),
        }
    }

    /// Lines and totals of the owner's cart; empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading fails.
    pub async fn view(&self, owner: Option<&CartOwner>) -> Result<CartView, CartServiceError> {
        let Some(owner) = owner else {
            return Ok(CartView::default());
        };
        let Some(cart) = self.carts.find(owner).await? else {
            return Ok(CartView::default());
        };
        let items = self.carts.items(cart.id).await?;
        Ok(CartView::from_items(items))
    }

    /// Add a product by slug.
    ///
    /// # Errors
    ///
    /// Rejects non-positive quantities, unknown products and products that
    /// are not `active`.
    pub async fn add(
        &self,
        owner: &CartOwner,
        product_slug: &str,
        requested: i64,
    ) -> Result<Added, CartServiceError> {
        let quantity = validate_add_quantity(requested)?;

        let product = self
            .catalog
            .product_by_slug(product_slug)
            .await?
            .ok_or(CartServiceError::ProductNotFound)?;
        if !product.status.is_purchasable() {
            return Err(CartServiceError::ProductUnavailable(product.name));
        }

        let cart = self.carts.get_or_create(owner).await?;
        let quantity = self.carts.add_item(cart.id, product.id, quantity).await?;

        tracing::info!(
            cart_id = %cart.id,
            product_id = %product.id,
            quantity,
            "added to cart"
        );
        Ok(Added {
            product_name: product.name,
            quantity,
        })
    }

    /// Apply the bulk update form. Returns how many items changed; items not
    /// in the owner's cart are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a statement fails.
    pub async fn update(
        &self,
        owner: &CartOwner,
        updates: &[(CartItemId, QuantityUpdate)],
    ) -> Result<usize, CartServiceError> {
        let Some(cart) = self.carts.find(owner).await? else {
            return Ok(0);
        };
        let mut changed = 0;
        for (item, update) in updates {
            if self.carts.apply_update(cart.id, *item, *update).await? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Remove one item of the owner's cart, returning the product name.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ItemNotFound` for items of other carts.
    pub async fn remove(
        &self,
        owner: Option<&CartOwner>,
        item: CartItemId,
    ) -> Result<String, CartServiceError> {
        let owner = owner.ok_or(CartServiceError::ItemNotFound)?;
        let cart = self
            .carts
            .find(owner)
            .await?
            .ok_or(CartServiceError::ItemNotFound)?;
        self.carts
            .remove_item(cart.id, item)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartServiceError::ItemNotFound,
                other => other.into(),
            })
    }

    /// Fold the visitor's session cart into the user's cart after login and
    /// forget the session cart key.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the merge fails.
    pub async fn merge_on_login(
        &self,
        session: &Session,
        user: UserId,
    ) -> Result<(), CartServiceError> {
        let key = session.remove::<String>(session_keys::CART_KEY).await?;
        if let Some(key) = key {
            let merged = self.carts.merge_session_cart(&key, user).await?;
            if merged > 0 {
                tracing::info!(user_id = %user, lines = merged, "session cart merged");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_parse_quantity_fields() {
        let updates = parse_quantity_fields(&form(&[
            ("quantity_3", "2"),
            ("quantity_1", "0"),
            ("quantity_2", "-4"),
            ("quantity_x", "1"),
            ("quantity_4", "many"),
            ("csrf", "abc"),
        ]))
        .unwrap();
        assert_eq!(
            updates,
            vec![
                (CartItemId::new(1), QuantityUpdate::Remove),
                (CartItemId::new(2), QuantityUpdate::Remove),
                (CartItemId::new(3), QuantityUpdate::Set(2)),
            ]
        );
    }

    #[test]
    fn test_oversized_quantity_rejects_the_whole_form() {
        let err = parse_quantity_fields(&form(&[
            ("quantity_3", "2"),
            ("quantity_5", "100000"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityTooLarge {
                max: technova_core::MAX_LINE_QUANTITY
            }
        );
        assert_eq!(CartServiceError::from(err).code(), "quantity_too_large");

        let at_limit = parse_quantity_fields(&form(&[("quantity_5", "999")])).unwrap();
        assert_eq!(
            at_limit,
            vec![(CartItemId::new(5), QuantityUpdate::Set(technova_core::MAX_LINE_QUANTITY))]
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CartServiceError::from(CartError::NonPositiveQuantity).code(),
            "invalid_quantity"
        );
        assert_eq!(CartServiceError::ItemNotFound.code(), "item_not_found");
    }
}
