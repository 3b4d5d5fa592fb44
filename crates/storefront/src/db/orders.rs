//! Order persistence, including the checkout transaction.

use sqlx::types::Json;
use sqlx::{Acquire, PgConnection, PgPool};
use thiserror::Error;

use technova_core::{
    Address, CartId, CheckoutError, CheckoutLine, Email, OrderDraft, OrderError, OrderId,
    OrderNumber, OrderStatus, PaymentMethod, ProductId, UserId,
};

use super::{Page, RepositoryError};
use crate::models::{Order, OrderItem, OrderSummary};

const ORDER_COLUMNS: &str = "\
    id, order_number, user_id, email, phone, shipping_address, billing_address, \
    status, payment_status, payment_method, subtotal, tax_amount, shipping_cost, \
    discount_amount, total_amount, notes, tracking_number, created_at, updated_at, \
    confirmed_at, shipped_at, delivered_at";

const SUMMARY_SELECT: &str = "\
    SELECT o.id, o.order_number, u.username, o.status, o.payment_status, o.total_amount, \
           COALESCE((SELECT SUM(oi.quantity) FROM order_items oi WHERE oi.order_id = o.id), 0)::BIGINT \
               AS item_count, \
           o.created_at \
    FROM orders o \
    JOIN users u ON u.id = o.user_id";

/// Unique constraint on `orders.order_number`.
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Attempts at finding an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Checkout form data that ends up on the order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub email: Email,
    pub phone: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub notes: String,
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The cart cannot become an order (empty, not enough stock).
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Errors from moving an order along its lifecycle.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Lifecycle(#[from] OrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

#[derive(sqlx::FromRow)]
struct LockedLine {
    product_id: ProductId,
    product_name: String,
    product_sku: Option<String>,
    product_image: Option<String>,
    #[sqlx(try_from = "i32")]
    quantity: u32,
    price: technova_core::Price,
    stock_quantity: i32,
}

impl From<LockedLine> for CheckoutLine {
    fn from(row: LockedLine) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            product_image: row.product_image,
            quantity: row.quantity,
            unit_price: row.price,
            stock_quantity: row.stock_quantity,
        }
    }
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {quantity} out of range")))
}

/// Insert the order row, retrying on an order-number collision inside a savepoint.
async fn insert_order(
    conn: &mut PgConnection,
    new: &NewOrder,
    draft: &OrderDraft,
) -> Result<Order, RepositoryError> {
    let sql = format!(
        "INSERT INTO orders ( \
             order_number, user_id, email, phone, shipping_address, billing_address, \
             payment_method, subtotal, tax_amount, shipping_cost, discount_amount, \
             total_amount, notes \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {ORDER_COLUMNS}"
    );

    let mut attempt = 1;
    loop {
        let order_number = OrderNumber::generate();
        let mut savepoint = Acquire::begin(&mut *conn).await?;
        let inserted = sqlx::query_as::<_, Order>(&sql)
            .bind(&order_number)
            .bind(new.user_id)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(Json(&new.shipping_address))
            .bind(Json(&new.billing_address))
            .bind(new.payment_method)
            .bind(draft.subtotal)
            .bind(draft.tax_amount)
            .bind(draft.shipping_cost)
            .bind(draft.discount_amount)
            .bind(draft.total_amount)
            .bind(&new.notes)
            .fetch_one(&mut *savepoint)
            .await;

        match inserted {
            Ok(order) => {
                savepoint.commit().await?;
                return Ok(order);
            }
            Err(sqlx::Error::Database(ref db_err))
                if db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT)
                    && attempt < ORDER_NUMBER_ATTEMPTS =>
            {
                savepoint.rollback().await?;
                tracing::warn!(%order_number, attempt, "order number collision, retrying");
                attempt += 1;
            }
            Err(e) => return Err(RepositoryError::from_unique(e, "order number")),
        }
    }
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the user's cart into an order in one transaction.
    ///
    /// The cart row and every product in it are locked (`FOR UPDATE`, in
    /// product id order) before stock is checked, so concurrent checkouts of
    /// the same product serialize. Stock is decremented with a guarded
    /// update, products that reach zero become `out_of_stock`, and the cart
    /// is emptied. Any failure rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Checkout` for an empty cart or insufficient
    /// stock, `PlaceOrderError::Repository` for database failures.
    pub async fn place_order(&self, new: &NewOrder) -> Result<(Order, OrderDraft), PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let cart: Option<CartId> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(new.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(cart) = cart else {
            return Err(CheckoutError::EmptyCart.into());
        };

        let lines = sqlx::query_as::<_, LockedLine>(
            "SELECT ci.product_id, p.name AS product_name, p.sku AS product_sku, \
                    p.primary_image AS product_image, ci.quantity, p.price, \
                    CASE WHEN p.status = 'active' THEN p.stock_quantity ELSE 0 END \
                        AS stock_quantity \
             FROM cart_items ci \
             JOIN products p ON p.id = ci.product_id \
             WHERE ci.cart_id = $1 \
             ORDER BY p.id \
             FOR UPDATE OF p",
        )
        .bind(cart)
        .fetch_all(&mut *tx)
        .await?;

        let draft = OrderDraft::from_lines(lines.into_iter().map(CheckoutLine::from).collect())?;

        let order = insert_order(&mut tx, new, &draft).await?;

        for item in &draft.items {
            let quantity = quantity_param(item.quantity)?;

            sqlx::query(
                "INSERT INTO order_items ( \
                     order_id, product_id, quantity, unit_price, total_price, \
                     product_name, product_sku, product_image \
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(&item.product_name)
            .bind(item.product_sku.as_deref().unwrap_or_default())
            .bind(item.product_image.as_deref())
            .execute(&mut *tx)
            .await?;

            let updated = sqlx::query(
                "UPDATE products \
                 SET stock_quantity = stock_quantity - $2, \
                     status = CASE WHEN stock_quantity - $2 = 0 \
                                   THEN 'out_of_stock'::product_status ELSE status END, \
                     updated_at = NOW() \
                 WHERE id = $1 AND stock_quantity >= $2",
            )
            .bind(item.product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    requested: item.quantity,
                    available: 0,
                }
                .into());
            }
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((order, draft))
    }

    /// A user's orders, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user: UserId,
        page: Page,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let sql = format!(
            "{SUMMARY_SELECT} WHERE o.user_id = $1 \
             ORDER BY o.created_at DESC, o.id DESC LIMIT $2 OFFSET $3"
        );
        let orders = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(user)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user)
            .fetch_one(self.pool)
            .await?;
        Ok((orders, total))
    }

    /// An order by number, visible only to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user: UserId,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1 AND user_id = $2");
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(number)
            .bind(user)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Line items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity, unit_price, total_price, \
                    product_name, product_sku, product_image \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order)
        .fetch_all(self.pool)
        .await?)
    }

    /// Customer cancellation. Only the owner may cancel, and only while the
    /// order is pending or confirmed. Stock of every line is restored.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` for another user's or a missing
    /// order and `StatusChangeError::Lifecycle` when it is too late to cancel.
    pub async fn cancel_for_user(
        &self,
        user: UserId,
        number: &OrderNumber,
    ) -> Result<Order, StatusChangeError> {
        self.change_status(number, Some(user), OrderStatus::Cancelled, None)
            .await
    }

    /// Staff status change along the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` for an unknown order and
    /// `StatusChangeError::Lifecycle` for a transition the lifecycle forbids.
    pub async fn update_status(
        &self,
        number: &OrderNumber,
        next: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, StatusChangeError> {
        self.change_status(number, None, next, tracking_number).await
    }

    async fn change_status(
        &self,
        number: &OrderNumber,
        owner: Option<UserId>,
        next: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(OrderId, OrderStatus)> = sqlx::query_as(
            "SELECT id, status FROM orders \
             WHERE order_number = $1 AND ($2::INTEGER IS NULL OR user_id = $2) \
             FOR UPDATE",
        )
        .bind(number)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((order_id, status)) = current else {
            return Err(StatusChangeError::NotFound);
        };

        let next = status.transition(next)?;

        let sql = format!(
            "UPDATE orders SET \
                 status = $2, \
                 confirmed_at = CASE WHEN $2 = 'confirmed'::order_status THEN NOW() ELSE confirmed_at END, \
                 shipped_at = CASE WHEN $2 = 'shipped'::order_status THEN NOW() ELSE shipped_at END, \
                 delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN NOW() ELSE delivered_at END, \
                 payment_status = CASE WHEN $2 = 'refunded'::order_status \
                                       THEN 'refunded'::payment_status ELSE payment_status END, \
                 tracking_number = COALESCE(NULLIF($3, ''), tracking_number), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(next)
            .bind(tracking_number.map(str::trim))
            .fetch_one(&mut *tx)
            .await?;

        if next == OrderStatus::Cancelled {
            // Same lock order as checkout.
            sqlx::query(
                "SELECT p.id FROM products p \
                 WHERE p.id IN (SELECT product_id FROM order_items WHERE order_id = $1) \
                 ORDER BY p.id \
                 FOR UPDATE",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE products p \
                 SET stock_quantity = p.stock_quantity + oi.quantity, \
                     status = CASE WHEN p.status = 'out_of_stock' \
                                   THEN 'active'::product_status ELSE p.status END, \
                     updated_at = NOW() \
                 FROM order_items oi \
                 WHERE oi.order_id = $1 AND p.id = oi.product_id",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }
}
