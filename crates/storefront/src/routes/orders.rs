//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use tower_sessions::Session;
use tracing::instrument;

use technova_core::{OrderNumber, UserId};

use crate::db::orders::StatusChangeError;
use crate::db::{OrderRepository, Page};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem, OrderSummary};
use crate::routes::{Layout, MessageQuery, PageQuery, redirect_error, redirect_success};
use crate::state::AppState;

/// Orders per history page.
const ORDERS_PER_PAGE: u32 = 10;

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderSummary>,
    pub page: u32,
    pub total_pages: u32,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub layout: Layout,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/success.html")]
pub struct OrderSuccessTemplate {
    pub layout: Layout,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Load an order of `user` with its items; anything else is a 404.
async fn owned_order(
    state: &AppState,
    user: UserId,
    number: &str,
) -> Result<(Order, Vec<OrderItem>)> {
    let not_found = || AppError::NotFound(format!("order {number}"));
    let number = OrderNumber::parse(number).map_err(|_| not_found())?;

    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_for_user(user, &number)
        .await?
        .ok_or_else(not_found)?;
    let items = orders.items(order.id).await?;
    Ok((order, items))
}

/// Display the user's orders, newest first.
#[instrument(skip(state, session, user, messages), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(page): Query<PageQuery>,
    Query(messages): Query<MessageQuery>,
) -> Result<OrderListTemplate> {
    let page = Page::new(page.page, ORDERS_PER_PAGE);
    let (orders, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, page)
        .await?;

    Ok(OrderListTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        orders,
        page: page.number,
        total_pages: page.total_pages(total),
    })
}

/// Display one of the user's orders.
#[instrument(skip(state, session, user, messages), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
    Query(messages): Query<MessageQuery>,
) -> Result<OrderDetailTemplate> {
    let (order, items) = owned_order(&state, user.id, &number).await?;

    Ok(OrderDetailTemplate {
        layout: Layout::load(&state, &session, Some(user), &messages).await,
        order,
        items,
    })
}

/// Display the confirmation page after checkout.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
) -> Result<OrderSuccessTemplate> {
    let (order, items) = owned_order(&state, user.id, &number).await?;

    Ok(OrderSuccessTemplate {
        layout: Layout::load(&state, &session, Some(user), &MessageQuery::default()).await,
        order,
        items,
    })
}

/// Cancel one of the user's orders and restock its items.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
) -> Result<Redirect> {
    let parsed = OrderNumber::parse(&number)
        .map_err(|_| AppError::NotFound(format!("order {number}")))?;
    let back = format!("/orders/{parsed}");

    match OrderRepository::new(state.pool())
        .cancel_for_user(user.id, &parsed)
        .await
    {
        Ok(order) => {
            add_breadcrumb(
                "order",
                "Order cancelled",
                Some(&[("order", order.order_number.as_str())]),
            );
            tracing::info!(order_number = %order.order_number, "order cancelled by customer");
            Ok(redirect_success(&back, "order_cancelled"))
        }
        Err(StatusChangeError::NotFound) => Err(AppError::NotFound(format!("order {number}"))),
        Err(StatusChangeError::Lifecycle(_)) => Ok(redirect_error(&back, "not_cancellable")),
        Err(StatusChangeError::Repository(e)) => Err(e.into()),
    }
}
