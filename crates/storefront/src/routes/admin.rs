//! Staff dashboard route handlers.
//!
//! Every handler takes [`RequireStaff`], so anonymous visitors are sent to
//! login and customers get 403.

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

use technova_core::{OrderNumber, OrderStatus, ReviewId};

use crate::db::dashboard::{DashboardStats, ProductRow, TopProduct};
use crate::db::orders::StatusChangeError;
use crate::db::{DashboardRepository, OrderRepository, ReviewRepository};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireStaff;
use crate::models::{OrderSummary, Review, User};
use crate::routes::{Layout, MessageQuery, redirect_error, redirect_success};
use crate::services::reviews::{ReviewService, ReviewServiceError};
use crate::state::AppState;

/// Rows in each dashboard panel.
const PANEL_SIZE: i64 = 5;

/// Width of `orders.tracking_number`.
const MAX_TRACKING_LENGTH: usize = 100;

/// Status change form on the order list.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    #[serde(default)]
    pub tracking_number: String,
}

impl StatusForm {
    /// Tracking number, if one was typed.
    fn tracking(&self) -> Option<&str> {
        Some(self.tracking_number.trim()).filter(|t| !t.is_empty())
    }

    fn tracking_too_long(&self) -> bool {
        self.tracking().is_some_and(|t| t.chars().count() > MAX_TRACKING_LENGTH)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
    pub recent_orders: Vec<OrderSummary>,
    pub top_products: Vec<TopProduct>,
    pub newest_users: Vec<User>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<ProductRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub layout: Layout,
    pub users: Vec<User>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderSummary>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/reviews.html")]
pub struct ReviewsTemplate {
    pub layout: Layout,
    pub reviews: Vec<Review>,
}

/// Display the dashboard: totals, latest orders, best sellers and sign-ups.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
    Query(messages): Query<MessageQuery>,
) -> Result<DashboardTemplate> {
    let repo = DashboardRepository::new(state.pool());
    let stats = repo.stats().await?;
    let recent_orders = repo.orders(Some(PANEL_SIZE)).await?;
    let top_products = repo.top_products(PANEL_SIZE).await?;
    let newest_users = repo.newest_users(PANEL_SIZE).await?;

    Ok(DashboardTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        stats,
        recent_orders,
        top_products,
        newest_users,
    })
}

/// List every product regardless of status.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
    Query(messages): Query<MessageQuery>,
) -> Result<ProductsTemplate> {
    let products = DashboardRepository::new(state.pool()).products().await?;

    Ok(ProductsTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        products,
    })
}

/// List every account.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn users(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
    Query(messages): Query<MessageQuery>,
) -> Result<UsersTemplate> {
    let users = DashboardRepository::new(state.pool()).users().await?;

    Ok(UsersTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        users,
    })
}

/// List every order with a status form for each.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
    Query(messages): Query<MessageQuery>,
) -> Result<OrdersTemplate> {
    let orders = DashboardRepository::new(state.pool()).orders(None).await?;

    Ok(OrdersTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        orders,
    })
}

/// Move an order along its lifecycle.
///
/// Cancelling here restocks the items the same way a customer cancellation
/// does.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(number): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    const BACK: &str = "/admin/orders";

    let Ok(number) = OrderNumber::parse(&number) else {
        return Ok(redirect_error(BACK, "order_not_found"));
    };
    let Ok(next) = form.status.parse::<OrderStatus>() else {
        return Ok(redirect_error(BACK, "invalid_status"));
    };
    if form.tracking_too_long() {
        return Ok(redirect_error(BACK, "tracking_too_long"));
    }

    match OrderRepository::new(state.pool())
        .update_status(&number, next, form.tracking())
        .await
    {
        Ok(order) => {
            add_breadcrumb(
                "order",
                "Order status changed",
                Some(&[
                    ("order", order.order_number.as_str()),
                    ("status", order.status.as_str()),
                ]),
            );
            tracing::info!(
                order_number = %order.order_number,
                status = %order.status,
                "order status updated by staff"
            );
            Ok(redirect_success(BACK, "status_updated"))
        }
        Err(StatusChangeError::NotFound) => Ok(redirect_error(BACK, "order_not_found")),
        Err(StatusChangeError::Lifecycle(e)) => {
            tracing::warn!(order_number = %number, reason = %e, "status change rejected");
            Ok(redirect_error(BACK, "invalid_transition"))
        }
        Err(StatusChangeError::Repository(e)) => Err(e.into()),
    }
}

/// Reviews waiting for moderation, oldest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn reviews(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
    Query(messages): Query<MessageQuery>,
) -> Result<ReviewsTemplate> {
    let reviews = ReviewRepository::new(state.pool()).pending().await?;

    Ok(ReviewsTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        reviews,
    })
}

/// Publish a pending review.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn approve_review(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<ReviewId>,
) -> Result<Redirect> {
    const BACK: &str = "/admin/reviews";

    match ReviewService::new(state.pool(), &state.config().store)
        .approve(id)
        .await
    {
        Ok(()) => Ok(redirect_success(BACK, "review_approved")),
        Err(ReviewServiceError::Repository(e)) => Err(e.into()),
        Err(e) => Ok(redirect_error(BACK, e.code())),
    }
}
