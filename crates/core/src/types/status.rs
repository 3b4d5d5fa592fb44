//! Status enums for catalog and order entities.
//!
//! Every enum maps to a Postgres enum type of the same snake_case name when
//! the `postgres` feature is enabled, and (de)serializes as snake_case so the
//! same values travel through HTML forms.

use serde::{Deserialize, Serialize};

/// Product availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    OutOfStock,
    Discontinued,
}

impl ProductStatus {
    /// Whether products in this status can be put in a cart.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::OutOfStock => "Out of stock",
            Self::Discontinued => "Discontinued",
        }
    }
}

/// Physical condition of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_condition", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductCondition {
    #[default]
    New,
    Refurbished,
    Used,
}

impl ProductCondition {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Refurbished => "Refurbished",
            Self::Used => "Used",
        }
    }
}

/// Errors raised by order lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The requested status change is not part of the lifecycle.
    #[error("cannot move an order from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
    /// The order is past the point where the customer may cancel it.
    #[error("orders in status {0} cannot be cancelled")]
    NotCancellable(OrderStatus),
}

/// Order lifecycle status.
///
/// ```text
/// pending ──► confirmed ──► processing ──► shipped ──► delivered
///    │            │             │             │            │
///    └──► cancelled ◄┘          └──────► refunded ◄────────┘
/// ```
///
/// Customers may cancel only while the order is pending or confirmed.
/// `cancelled` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Whether the customer may still cancel.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether the order has reached the end of its fulfilment.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Delivered | Self::Refunded)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Processing)
            | (Self::Processing, Self::Shipped)
            | (Self::Shipped, Self::Delivered)
            | (
                Self::Confirmed | Self::Processing | Self::Shipped | Self::Delivered,
                Self::Refunded,
            ) => true,
            (current, Self::Cancelled) => current.is_cancellable(),
            _ => false,
        }
    }

    /// Statuses reachable from `self` in one step.
    #[must_use]
    pub fn next_statuses(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// Validate a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotCancellable`] for a cancellation outside
    /// pending/confirmed and [`OrderError::InvalidTransition`] for any other
    /// move that is not part of the lifecycle.
    pub const fn transition(self, next: Self) -> Result<Self, OrderError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else if matches!(next, Self::Cancelled) {
            Err(OrderError::NotCancellable(self))
        } else {
            Err(OrderError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Database/form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
            Self::PartiallyRefunded => "Partially refunded",
        }
    }
}

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    /// All methods offered at checkout.
    pub const ALL: [Self; 5] = [
        Self::CreditCard,
        Self::DebitCard,
        Self::Paypal,
        Self::BankTransfer,
        Self::CashOnDelivery,
    ];

    /// Database/form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Paypal => "paypal",
            Self::BankTransfer => "bank_transfer",
            Self::CashOnDelivery => "cash_on_delivery",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreditCard => "Credit card",
            Self::DebitCard => "Debit card",
            Self::Paypal => "PayPal",
            Self::BankTransfer => "Bank transfer",
            Self::CashOnDelivery => "Cash on delivery",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            let [from, to] = pair else { unreachable!() };
            assert_eq!(from.transition(*to), Ok(*to));
        }
    }

    #[test]
    fn test_cancellation_only_from_pending_or_confirmed() {
        for status in OrderStatus::ALL {
            let allowed = status.can_transition_to(OrderStatus::Cancelled);
            assert_eq!(
                allowed,
                matches!(status, OrderStatus::Pending | OrderStatus::Confirmed),
                "{status}"
            );
        }
        assert_eq!(
            OrderStatus::Shipped.transition(OrderStatus::Cancelled),
            Err(OrderError::NotCancellable(OrderStatus::Shipped))
        );
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
            assert!(terminal.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Refunded));
        assert!(matches!(
            OrderStatus::Pending.transition(OrderStatus::Delivered),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_next_statuses() {
        assert_eq!(
            OrderStatus::Pending.next_statuses(),
            vec![OrderStatus::Confirmed, OrderStatus::Cancelled]
        );
        assert_eq!(
            OrderStatus::Shipped.next_statuses(),
            vec![OrderStatus::Delivered, OrderStatus::Refunded]
        );
        assert!(OrderStatus::Refunded.next_statuses().is_empty());
    }

    #[test]
    fn test_completed_states() {
        assert!(OrderStatus::Delivered.is_completed());
        assert!(OrderStatus::Refunded.is_completed());
        assert!(!OrderStatus::Shipped.is_completed());
        assert!(!OrderStatus::Cancelled.is_completed());
    }

    #[test]
    fn test_order_status_from_str_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_only_active_products_are_purchasable() {
        assert!(ProductStatus::Active.is_purchasable());
        assert!(!ProductStatus::Inactive.is_purchasable());
        assert!(!ProductStatus::OutOfStock.is_purchasable());
        assert!(!ProductStatus::Discontinued.is_purchasable());
    }

    #[test]
    fn test_payment_method_serde_matches_as_str() {
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }
}
