//! Orders and their frozen line items.

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use technova_core::{
    Address, Email, OrderId, OrderItemId, OrderNumber, OrderStatus, PaymentMethod,
    PaymentStatus, Price, ProductId, UserId,
};

use super::catalog::media_url;

/// A placed order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub email: Email,
    pub phone: String,
    pub shipping_address: Json<Address>,
    pub billing_address: Json<Address>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Price,
    pub tax_amount: Price,
    pub shipping_cost: Price,
    pub discount_amount: Price,
    pub total_amount: Price,
    pub notes: String,
    pub tracking_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn url(&self) -> String {
        format!("/orders/{}", self.order_number)
    }
}

/// An order line. Name, SKU, image and price are copies taken at checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    #[sqlx(try_from = "i32")]
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Price,
    pub product_name: String,
    pub product_sku: String,
    pub product_image: Option<String>,
}

impl OrderItem {
    #[must_use]
    pub fn image_url(&self) -> String {
        media_url(self.product_image.as_deref())
    }
}

/// One row of an order history or admin order list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub username: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Price,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}
