//! Read-only queries behind the staff dashboard.

use sqlx::PgPool;

use technova_core::{Price, ProductId, ProductStatus};

use super::RepositoryError;
use crate::models::{OrderSummary, User};

/// Headline numbers on the dashboard.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_users: i64,
    pub orders_today: i64,
    pub newsletter_subscribers: i64,
    pub unread_messages: i64,
}

/// A product ranked by how many order lines reference it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub order_lines: i64,
}

/// A row of the staff product list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category_name: String,
    pub price: Price,
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

const SUMMARY_SELECT: &str = "\
    SELECT o.id, o.order_number, u.username, o.status, o.payment_status, o.total_amount, \
           COALESCE((SELECT SUM(oi.quantity) FROM order_items oi WHERE oi.order_id = o.id), 0)::BIGINT \
               AS item_count, \
           o.created_at \
    FROM orders o \
    JOIN users u ON u.id = o.user_id \
    ORDER BY o.created_at DESC, o.id DESC";

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active, is_staff, \
                            date_joined, last_login";

/// Repository for staff reporting.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Product and user totals plus orders placed since midnight (UTC).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        Ok(sqlx::query_as::<_, DashboardStats>(
            "SELECT \
                 (SELECT COUNT(*) FROM products) AS total_products, \
                 (SELECT COUNT(*) FROM users) AS total_users, \
                 (SELECT COUNT(*) FROM orders \
                  WHERE created_at >= date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC') \
                     AS orders_today, \
                 (SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active) \
                     AS newsletter_subscribers, \
                 (SELECT COUNT(*) FROM contact_messages WHERE NOT is_read) AS unread_messages",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Products appearing in the most order lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        Ok(sqlx::query_as::<_, TopProduct>(
            "SELECT p.id AS product_id, p.name, COUNT(oi.id) AS order_lines \
             FROM products p \
             JOIN order_items oi ON oi.product_id = p.id \
             GROUP BY p.id, p.name \
             ORDER BY order_lines DESC, p.name \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Most recently joined users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest_users(&self, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC, id DESC LIMIT $1"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Every user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn users(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC, id DESC");
        Ok(sqlx::query_as::<_, User>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Every product whatever its status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self) -> Result<Vec<ProductRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, ProductRow>(
            "SELECT p.id, p.name, p.sku, c.name AS category_name, p.price, \
                    p.stock_quantity, p.status \
             FROM products p \
             JOIN categories c ON c.id = p.category_id \
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Orders, newest first. `limit` of `None` returns all of them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders(&self, limit: Option<i64>) -> Result<Vec<OrderSummary>, RepositoryError> {
        let sql = format!("{SUMMARY_SELECT} LIMIT $1");
        Ok(sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }
}
