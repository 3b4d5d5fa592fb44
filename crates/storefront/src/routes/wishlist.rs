//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use tower_sessions::Session;
use tracing::instrument;

use technova_core::WishlistItemId;

use crate::db::{CatalogRepository, RepositoryError, WishlistRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::WishlistEntry;
use crate::routes::{Layout, MessageQuery, redirect_error, redirect_success};
use crate::state::AppState;

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/index.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub entries: Vec<WishlistEntry>,
}

/// Display the user's wishlist.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<WishlistTemplate> {
    let entries = WishlistRepository::new(state.pool()).list(user.id).await?;

    Ok(WishlistTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        entries,
    })
}

/// Save a product. Saving it twice is reported, not an error.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product): Path<String>,
) -> Result<Redirect> {
    let Some(product) = CatalogRepository::new(state.pool())
        .product_by_slug(&product)
        .await?
    else {
        return Ok(redirect_error("/wishlist", "product_not_found"));
    };

    let added = WishlistRepository::new(state.pool())
        .add(user.id, product.id)
        .await?;
    if added {
        tracing::info!(product_id = %product.id, "added to wishlist");
    }

    let code = if added { "wishlist_added" } else { "already_in_wishlist" };
    Ok(redirect_success(&product.url(), code))
}

/// Remove one of the user's wishlist entries.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<WishlistItemId>,
) -> Result<Redirect> {
    match WishlistRepository::new(state.pool()).remove(user.id, id).await {
        Ok(name) => {
            tracing::info!(product = %name, "removed from wishlist");
            Ok(redirect_success("/wishlist", "wishlist_removed"))
        }
        Err(RepositoryError::NotFound) => Ok(redirect_error("/wishlist", "wishlist_not_found")),
        Err(e) => Err(e.into()),
    }
}
