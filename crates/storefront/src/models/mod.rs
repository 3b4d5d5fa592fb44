//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and are loaded with runtime queries in
//! [`crate::db`]. Money, IDs and statuses use the typed wrappers from
//! `technova-core`.

pub mod cart;
pub mod catalog;
pub mod contact;
pub mod order;
pub mod review;
pub mod session;
pub mod user;
pub mod wishlist;

pub use cart::{Cart, CartItem, CartOwner, CartView};
pub use catalog::{Category, Product, ProductImage};
pub use contact::ContactSubject;
pub use order::{Order, OrderItem, OrderSummary};
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
pub use wishlist::WishlistEntry;
