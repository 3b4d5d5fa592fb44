//! Pricing and lifecycle rules as the storefront strings them together:
//! cart lines are totalled, the locked cart becomes an order draft, and the
//! resulting order walks its status lifecycle.
//!
//! Run with: `cargo test -p technova-integration-tests --test order_rules`

#![allow(clippy::unwrap_used)]

use technova_core::{
    CartLine, CartTotals, CheckoutError, CheckoutLine, OrderDraft, OrderError, OrderStatus,
    Price, ProductId, QuantityUpdate, Rating, RatingSummary, validate_add_quantity,
};

fn cart() -> Vec<CartLine> {
    vec![
        CartLine {
            product_id: ProductId::new(1),
            quantity: 2,
            unit_price: Price::from_cents(89_999),
            compare_at_price: Some(Price::from_cents(99_999)),
        },
        CartLine {
            product_id: ProductId::new(2),
            quantity: 1,
            unit_price: Price::from_cents(4_950),
            compare_at_price: None,
        },
    ]
}

fn checkout_lines(lines: &[CartLine], stock: i32) -> Vec<CheckoutLine> {
    lines
        .iter()
        .map(|line| CheckoutLine {
            product_id: line.product_id,
            product_name: format!("Product {}", line.product_id),
            product_sku: None,
            product_image: None,
            quantity: line.quantity,
            unit_price: line.unit_price,
            stock_quantity: stock,
        })
        .collect()
}

#[test]
fn test_order_total_matches_cart_subtotal() {
    let lines = cart();
    let totals = CartTotals::from_lines(&lines);
    let draft = OrderDraft::from_lines(checkout_lines(&lines, 10)).unwrap();

    assert_eq!(totals.item_count, 3);
    assert_eq!(totals.subtotal, Price::from_cents(184_948));
    assert_eq!(totals.savings, Price::from_cents(20_000));
    assert_eq!(draft.subtotal, totals.subtotal);
    assert_eq!(draft.total_amount, totals.subtotal);
    assert_eq!(draft.item_count(), totals.item_count);
}

#[test]
fn test_short_stock_blocks_the_whole_order() {
    let lines = cart();
    let err = OrderDraft::from_lines(checkout_lines(&lines, 1)).unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { requested: 2, available: 1, .. }
    ));
}

#[test]
fn test_cart_quantity_rules() {
    assert!(validate_add_quantity(0).is_err());
    assert_eq!(validate_add_quantity(3).unwrap(), 3);
    assert_eq!(QuantityUpdate::from_requested(0).unwrap(), QuantityUpdate::Remove);
    assert_eq!(QuantityUpdate::from_requested(-4).unwrap(), QuantityUpdate::Remove);
    assert_eq!(QuantityUpdate::from_requested(7).unwrap(), QuantityUpdate::Set(7));
}

#[test]
fn test_order_walks_the_happy_path() {
    let mut status = OrderStatus::default();
    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        status = status.transition(next).unwrap();
    }

    assert_eq!(status, OrderStatus::Delivered);
    assert!(status.is_completed());
    assert!(!status.is_cancellable());
}

#[test]
fn test_shipped_order_cannot_be_cancelled() {
    let status = OrderStatus::Shipped;

    assert!(!status.is_cancellable());
    assert!(matches!(
        status.transition(OrderStatus::Cancelled),
        Err(OrderError::NotCancellable(OrderStatus::Shipped))
    ));
    assert!(status.next_statuses().contains(&OrderStatus::Refunded));
}

#[test]
fn test_rating_summary_over_approved_reviews() {
    let summary = RatingSummary::from_ratings(
        [5, 4, 4].into_iter().map(|v| Rating::new(v).unwrap()),
    );

    assert_eq!(summary.count, 3);
    assert_eq!(summary.display_average(), "4.3");
    assert!(Rating::new(6).is_err());
}
