//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::routes::{Layout, MessageQuery};
use crate::state::AppState;

/// Number of products in the featured grid.
const FEATURED_PRODUCTS: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    /// Newest products that are active and in stock.
    pub featured: Vec<Product>,
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> HomeTemplate {
    let featured = CatalogRepository::new(state.pool())
        .featured_products(FEATURED_PRODUCTS)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch featured products: {e}");
            Vec::new()
        });

    HomeTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        featured,
    }
}
