//! Account dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::{OrderRepository, Page, UserRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{OrderSummary, User, WishlistEntry};
use crate::routes::{Layout, MessageQuery};
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: u32 = 5;

/// Account dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub account: User,
    pub recent_orders: Vec<OrderSummary>,
    pub order_count: i64,
    pub wishlist: Vec<WishlistEntry>,
    pub wishlist_count: i64,
}

/// Display the account dashboard.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<AccountTemplate> {
    let account = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user.id)))?;

    let (recent_orders, order_count) = OrderRepository::new(state.pool())
        .list_for_user(user.id, Page::new(None, RECENT_ORDERS))
        .await?;

    let wishlist_repo = WishlistRepository::new(state.pool());
    let wishlist = wishlist_repo.list(user.id).await?;
    let wishlist_count = wishlist_repo.count(user.id).await?;

    Ok(AccountTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        account,
        recent_orders,
        order_count,
        wishlist,
        wishlist_count,
    })
}
