//! Turning a locked cart into an order snapshot.
//!
//! The storefront locks the cart and product rows, builds one
//! [`CheckoutLine`] per cart item, and asks [`OrderDraft::from_lines`] for
//! the figures to persist. Everything the order stores about a product is
//! copied here, so later catalog edits never change a placed order.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Errors raised while drafting an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    /// A line asks for more units than are in stock.
    #[error("only {available} of {product_name} left in stock")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: i32,
    },
}

/// A cart item joined with the current product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub product_image: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub stock_quantity: i32,
}

impl CheckoutLine {
    fn has_stock(&self) -> bool {
        i64::from(self.stock_quantity) >= i64::from(self.quantity)
    }
}

/// A frozen order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub product_image: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Price,
}

/// Money figures and lines of an order about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<OrderItemDraft>,
    pub subtotal: Price,
    pub tax_amount: Price,
    pub shipping_cost: Price,
    pub discount_amount: Price,
    pub total_amount: Price,
}

impl OrderDraft {
    /// Draft an order from the locked cart lines.
    ///
    /// Tax, shipping and discount are not charged, so the total equals the
    /// subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for no lines and
    /// [`CheckoutError::InsufficientStock`] for the first line whose
    /// quantity exceeds the product's stock.
    pub fn from_lines(lines: Vec<CheckoutLine>) -> Result<Self, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if let Some(short) = lines.iter().find(|line| !line.has_stock()) {
            return Err(CheckoutError::InsufficientStock {
                product_id: short.product_id,
                product_name: short.product_name.clone(),
                requested: short.quantity,
                available: short.stock_quantity,
            });
        }

        let items: Vec<OrderItemDraft> = lines
            .into_iter()
            .map(|line| OrderItemDraft {
                total_price: line.unit_price.times(line.quantity),
                product_id: line.product_id,
                product_name: line.product_name,
                product_sku: line.product_sku,
                product_image: line.product_image,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let subtotal: Price = items.iter().map(|item| item.total_price).sum();
        let tax_amount = Price::ZERO;
        let shipping_cost = Price::ZERO;
        let discount_amount = Price::ZERO;

        Ok(Self {
            items,
            subtotal,
            tax_amount,
            shipping_cost,
            discount_amount,
            total_amount: subtotal + tax_amount + shipping_cost - discount_amount,
        })
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, qty: u32, cents: i64, stock: i32) -> CheckoutLine {
        CheckoutLine {
            product_id: ProductId::new(id),
            product_name: format!("Product {id}"),
            product_sku: Some(format!("SKU-{id}")),
            product_image: None,
            quantity: qty,
            unit_price: Price::from_cents(cents),
            stock_quantity: stock,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(OrderDraft::from_lines(vec![]), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_totals_are_sum_of_lines() {
        let draft =
            OrderDraft::from_lines(vec![line(1, 2, 19_999, 5), line(2, 1, 4_950, 1)]).unwrap();

        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.item_count(), 3);
        assert_eq!(draft.items[0].total_price, Price::from_cents(39_998));
        assert_eq!(draft.subtotal, Price::from_cents(44_948));
        assert_eq!(draft.total_amount, draft.subtotal);
        assert_eq!(draft.tax_amount, Price::ZERO);
    }

    #[test]
    fn test_insufficient_stock_names_product() {
        let err = OrderDraft::from_lines(vec![line(1, 1, 100, 3), line(7, 4, 100, 3)]).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: ProductId::new(7),
                product_name: "Product 7".to_owned(),
                requested: 4,
                available: 3,
            }
        );
        assert_eq!(err.to_string(), "only 3 of Product 7 left in stock");
    }

    #[test]
    fn test_exact_stock_is_enough() {
        assert!(OrderDraft::from_lines(vec![line(1, 3, 100, 3)]).is_ok());
    }

    #[test]
    fn test_snapshot_keeps_name_and_sku() {
        let draft = OrderDraft::from_lines(vec![line(4, 1, 100, 9)]).unwrap();
        assert_eq!(draft.items[0].product_name, "Product 4");
        assert_eq!(draft.items[0].product_sku.as_deref(), Some("SKU-4"));
    }
}
