//! Cart arithmetic and quantity rules.
//!
//! Persistence lives in the storefront crate; this module only knows how to
//! price lines, total a cart and interpret requested quantities.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Errors raised by cart quantity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Adding zero or a negative amount.
    #[error("quantity must be greater than 0")]
    NonPositiveQuantity,
    /// The requested quantity is above the per-line limit.
    #[error("quantity must be at most {max}")]
    QuantityTooLarge {
        /// Per-line limit.
        max: u32,
    },
}

/// Validate the quantity submitted with an "add to cart" form.
///
/// # Errors
///
/// Returns [`CartError::NonPositiveQuantity`] for `qty <= 0` and
/// [`CartError::QuantityTooLarge`] above [`MAX_LINE_QUANTITY`].
pub fn validate_add_quantity(qty: i64) -> Result<u32, CartError> {
    if qty <= 0 {
        return Err(CartError::NonPositiveQuantity);
    }
    u32::try_from(qty)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or(CartError::QuantityTooLarge {
            max: MAX_LINE_QUANTITY,
        })
}

/// What an "update quantity" request does to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Drop the line from the cart.
    Remove,
    /// Overwrite the line quantity.
    Set(u32),
}

impl QuantityUpdate {
    /// Interpret a requested quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityTooLarge`] above [`MAX_LINE_QUANTITY`].
    pub fn from_requested(qty: i64) -> Result<Self, CartError> {
        if qty <= 0 {
            return Ok(Self::Remove);
        }
        validate_add_quantity(qty).map(Self::Set)
    }
}

/// One priced line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
    pub compare_at_price: Option<Price>,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Whether the product sells below its compare-at price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|c| c > self.unit_price)
    }

    /// `(compare_at − price) × quantity` when on sale, else zero.
    #[must_use]
    pub fn total_savings(&self) -> Price {
        match self.compare_at_price {
            Some(compare_at) if compare_at > self.unit_price => {
                (compare_at - self.unit_price).times(self.quantity)
            }
            _ => Price::ZERO,
        }
    }
}

/// Aggregate figures shown on the cart page and in the header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of quantities.
    pub item_count: u32,
    /// Number of distinct products.
    pub line_count: usize,
    pub subtotal: Price,
    pub savings: Price,
}

impl CartTotals {
    /// Total a set of lines.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        Self {
            item_count: lines.iter().map(|l| l.quantity).sum(),
            line_count: lines.len(),
            subtotal: lines.iter().map(CartLine::total_price).sum(),
            savings: lines.iter().map(CartLine::total_savings).sum(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, qty: u32, price: i64, compare_at: Option<i64>) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            quantity: qty,
            unit_price: Price::from_cents(price),
            compare_at_price: compare_at.map(Price::from_cents),
        }
    }

    #[test]
    fn test_add_quantity_rules() {
        assert_eq!(validate_add_quantity(1), Ok(1));
        assert_eq!(validate_add_quantity(999), Ok(999));
        assert_eq!(
            validate_add_quantity(0),
            Err(CartError::NonPositiveQuantity)
        );
        assert_eq!(
            validate_add_quantity(-3),
            Err(CartError::NonPositiveQuantity)
        );
        assert_eq!(
            validate_add_quantity(1000),
            Err(CartError::QuantityTooLarge { max: 999 })
        );
        assert!(validate_add_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_update_non_positive_removes() {
        for qty in [0, -1, -50, i64::MIN] {
            assert_eq!(QuantityUpdate::from_requested(qty), Ok(QuantityUpdate::Remove));
        }
        assert_eq!(QuantityUpdate::from_requested(4), Ok(QuantityUpdate::Set(4)));
    }

    #[test]
    fn test_line_totals_and_savings() {
        let sale = line(1, 2, 89_900, Some(99_900));
        assert_eq!(sale.total_price(), Price::from_cents(179_800));
        assert_eq!(sale.total_savings(), Price::from_cents(20_000));
        assert!(sale.is_on_sale());

        let full_price = line(2, 3, 5_000, Some(5_000));
        assert!(!full_price.is_on_sale());
        assert_eq!(full_price.total_savings(), Price::ZERO);
    }

    #[test]
    fn test_cart_totals() {
        let lines = [line(1, 2, 1_000, Some(1_500)), line(2, 1, 2_550, None)];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.subtotal, Price::from_cents(4_550));
        assert_eq!(totals.savings, Price::from_cents(1_000));
        assert!(!totals.is_empty());
        assert!(CartTotals::from_lines(&[]).is_empty());
    }
}
