//! Cart rows and the assembled cart view.

use technova_core::{
    CartId, CartItemId, CartLine, CartTotals, Price, ProductId, ProductStatus, UserId,
};

use super::catalog::media_url;

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    /// A signed-in user.
    User(UserId),
    /// An anonymous visitor, keyed by the token kept in their session.
    Session(String),
}

/// A cart row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub session_key: Option<String>,
}

/// A cart item joined with the product it holds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    #[sqlx(try_from = "i32")]
    pub quantity: u32,
    pub product_name: String,
    pub product_slug: String,
    pub category_slug: String,
    pub primary_image: Option<String>,
    pub price: Price,
    pub compare_at_price: Option<Price>,
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

impl CartItem {
    /// Pricing view of this item.
    #[must_use]
    pub const fn line(&self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.price,
            compare_at_price: self.compare_at_price,
        }
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.line().total_price()
    }

    #[must_use]
    pub fn total_savings(&self) -> Price {
        self.line().total_savings()
    }

    /// More units in the cart than the product has in stock; checkout
    /// will refuse until the quantity comes down.
    #[must_use]
    pub fn exceeds_stock(&self) -> bool {
        i64::from(self.quantity) > i64::from(self.stock_quantity)
    }

    #[must_use]
    pub fn product_url(&self) -> String {
        format!("/categories/{}/{}", self.category_slug, self.product_slug)
    }

    #[must_use]
    pub fn image_url(&self) -> String {
        media_url(self.primary_image.as_deref())
    }
}

/// Items plus totals, as rendered on the cart and checkout pages.
#[derive(Debug, Clone, Default)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl CartView {
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let lines: Vec<CartLine> = items.iter().map(CartItem::line).collect();
        Self {
            totals: CartTotals::from_lines(&lines),
            items,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, qty: u32, cents: i64) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(id),
            quantity: qty,
            product_name: format!("Product {id}"),
            product_slug: format!("product-{id}"),
            category_slug: "laptops".to_owned(),
            primary_image: None,
            price: Price::from_cents(cents),
            compare_at_price: None,
            stock_quantity: 10,
            status: ProductStatus::Active,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::from_items(vec![item(1, 2, 50_000), item(2, 1, 2_500)]);
        assert_eq!(view.totals.item_count, 3);
        assert_eq!(view.totals.subtotal, Price::from_cents(102_500));
        assert_eq!(view.items[0].product_url(), "/categories/laptops/product-1");
        assert!(!view.is_empty());
        assert!(CartView::default().is_empty());
    }

    #[test]
    fn test_exceeds_stock() {
        let mut line = item(1, 10, 100);
        assert!(!line.exceeds_stock());
        line.quantity = 11;
        assert!(line.exceeds_stock());
        line.stock_quantity = -1;
        line.quantity = 0;
        assert!(line.exceeds_stock());
    }
}
