//! Checkout service: validates the checkout form and places the order.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use technova_core::{Address, CheckoutError, Email, OrderDraft, PaymentMethod};

use crate::db::RepositoryError;
use crate::db::orders::{NewOrder, OrderRepository, PlaceOrderError};
use crate::models::{CurrentUser, Order};

/// Width of `orders.phone`.
pub const MAX_PHONE_LENGTH: usize = 20;

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub billing_city: String,
    #[serde(default)]
    pub billing_postal: String,
    /// Checkbox; present when ticked.
    pub same_as_shipping: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] technova_core::EmailError),

    #[error("phone number is longer than {MAX_PHONE_LENGTH} characters")]
    PhoneTooLong,

    #[error("shipping address is incomplete")]
    IncompleteShipping,

    #[error("billing address is incomplete")]
    IncompleteBilling,

    #[error("unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PlaceOrderError> for CheckoutServiceError {
    fn from(e: PlaceOrderError) -> Self {
        match e {
            PlaceOrderError::Checkout(e) => Self::Checkout(e),
            PlaceOrderError::Repository(e) => Self::Repository(e),
        }
    }
}

impl CheckoutServiceError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::PhoneTooLong => "phone_too_long",
            Self::IncompleteShipping => "shipping_address",
            Self::IncompleteBilling => "billing_address",
            Self::UnknownPaymentMethod(_) => "payment_method",
            Self::Checkout(CheckoutError::EmptyCart) => "empty_cart",
            Self::Checkout(CheckoutError::InsufficientStock { .. }) => "insufficient_stock",
            Self::Repository(_) => "server",
        }
    }
}

/// Parse a payment method form value.
fn parse_payment_method(value: &str) -> Option<PaymentMethod> {
    PaymentMethod::ALL
        .into_iter()
        .find(|method| method.as_str() == value.trim())
}

impl CheckoutForm {
    /// Validate the form into the order header for `user`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn into_new_order(self, user: &CurrentUser) -> Result<NewOrder, CheckoutServiceError> {
        let email = Email::parse(&self.email)?;

        let phone = self.phone.trim();
        if phone.chars().count() > MAX_PHONE_LENGTH {
            return Err(CheckoutServiceError::PhoneTooLong);
        }

        let shipping = Address::new(
            &self.shipping_address,
            &self.shipping_city,
            &self.shipping_postal,
        );
        if !shipping.is_complete() {
            return Err(CheckoutServiceError::IncompleteShipping);
        }

        let billing = if self.same_as_shipping.is_some() {
            shipping.clone()
        } else {
            let billing = Address::new(
                &self.billing_address,
                &self.billing_city,
                &self.billing_postal,
            );
            if !billing.is_complete() {
                return Err(CheckoutServiceError::IncompleteBilling);
            }
            billing
        };

        let payment_method = parse_payment_method(&self.payment_method)
            .ok_or_else(|| CheckoutServiceError::UnknownPaymentMethod(self.payment_method.clone()))?;

        Ok(NewOrder {
            user_id: user.id,
            email,
            phone: phone.to_owned(),
            shipping_address: shipping,
            billing_address: billing,
            payment_method,
            notes: self.notes.trim().to_owned(),
        })
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Validate the form and turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad form data, `Checkout` for an
    /// empty cart or missing stock, `Repository` for database failures.
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        form: CheckoutForm,
    ) -> Result<Order, CheckoutServiceError> {
        let new = form.into_new_order(user)?;
        let (order, draft): (Order, OrderDraft) = self.orders.place_order(&new).await?;

        tracing::info!(
            order_number = %order.order_number,
            user_id = %user.id,
            items = draft.item_count(),
            total = %order.total_amount,
            "order placed"
        );
        Ok(order)
    }
}
