//! Catalog route handlers: listings, search, categories and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use technova_core::ProductStatus;

use crate::db::{CatalogRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{Category, Product, ProductImage, Review};
use crate::routes::{Layout, MessageQuery};
use crate::state::AppState;

/// Related products shown under a product.
const RELATED_PRODUCTS: i64 = 4;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Product grid page (all products, sale, search results).
#[derive(Template, WebTemplate)]
#[template(path = "products/list.html")]
pub struct ProductListTemplate {
    pub layout: Layout,
    pub heading: String,
    pub products: Vec<Product>,
    /// The search box value; empty outside search.
    pub query: String,
}

/// Category page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/category.html")]
pub struct CategoryTemplate {
    pub layout: Layout,
    pub category: Category,
    pub subcategories: Vec<Category>,
    pub products: Vec<Product>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/detail.html")]
pub struct ProductDetailTemplate {
    pub layout: Layout,
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub reviews: Vec<Review>,
    pub related: Vec<Product>,
    /// The visitor's own review, approved or not.
    pub own_review: Option<Review>,
}

impl ProductDetailTemplate {
    /// Options for the review form's rating select, highest first. The
    /// second element is the `selected` attribute: the visitor's current
    /// rating, or 5.
    #[must_use]
    pub fn rating_options(&self) -> Vec<(u8, &'static str)> {
        let current = self.own_review.as_ref().map_or(5, |r| r.rating.value());
        (1..=5)
            .rev()
            .map(|n| (n, if n == current { "selected" } else { "" }))
            .collect()
    }
}

/// Display every listable product.
#[instrument(skip_all)]
pub async fn all(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<ProductListTemplate> {
    let products = CatalogRepository::new(state.pool()).all_products().await?;

    Ok(ProductListTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        heading: "All products".to_owned(),
        products,
        query: String::new(),
    })
}

/// Display products on sale.
#[instrument(skip_all)]
pub async fn sale(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<ProductListTemplate> {
    let products = CatalogRepository::new(state.pool()).sale_products().await?;

    Ok(ProductListTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        heading: "On sale".to_owned(),
        products,
        query: String::new(),
    })
}

/// Display search results for `?q=`.
#[instrument(skip(state, session, user, messages), fields(q = %search.q))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(search): Query<SearchQuery>,
    Query(messages): Query<MessageQuery>,
) -> Result<ProductListTemplate> {
    let query = search.q.trim().to_owned();
    let products = CatalogRepository::new(state.pool()).search(&query).await?;

    let heading = if query.is_empty() {
        "Search".to_owned()
    } else {
        format!("Results for \u{201c}{query}\u{201d}")
    };

    Ok(ProductListTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        heading,
        products,
        query,
    })
}

/// Display a category with its subcategories and products.
#[instrument(skip(state, session, user, messages))]
pub async fn category(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(category): Path<String>,
    Query(messages): Query<MessageQuery>,
) -> Result<CategoryTemplate> {
    let catalog = CatalogRepository::new(state.pool());
    let category = catalog
        .category_by_slug(&category)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {category}")))?;

    let subcategories = catalog.subcategories(category.id).await?;
    let products = catalog.products_in_category(category.id).await?;

    Ok(CategoryTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        category,
        subcategories,
        products,
    })
}

/// Display a product.
///
/// Out-of-stock and discontinued products stay reachable from old links but
/// cannot be bought. `inactive` products are only shown to staff.
#[instrument(skip(state, session, user, messages))]
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path((category, product)): Path<(String, String)>,
    Query(messages): Query<MessageQuery>,
) -> Result<ProductDetailTemplate> {
    let catalog = CatalogRepository::new(state.pool());
    let product = catalog
        .product_in_category(&category, &product)
        .await?
        .filter(|p| {
            p.status != ProductStatus::Inactive || user.as_ref().is_some_and(|u| u.is_staff)
        })
        .ok_or_else(|| AppError::NotFound(format!("product {category}/{product}")))?;

    let reviews = ReviewRepository::new(state.pool());
    let images = catalog.images(product.id).await?;
    let approved = reviews.approved_for_product(product.id).await?;
    let related = catalog
        .related_products(product.category_id, product.id, RELATED_PRODUCTS)
        .await?;
    let own_review = match &user {
        Some(user) => reviews.by_user(product.id, user.id).await?,
        None => None,
    };

    Ok(ProductDetailTemplate {
        layout: Layout::load(&state, &session, user, &messages).await,
        product,
        images,
        reviews: approved,
        related,
        own_review,
    })
}
