//! TechNova Core - Shared domain library.
//!
//! This crate provides the types and rules used across all TechNova components:
//! - `storefront` - Public-facing store and staff dashboard
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The storefront loads rows, hands them to these functions,
//! and persists whatever they return. That keeps the cart, checkout and rating
//! rules testable without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, order numbers and statuses
//! - [`cart`] - Cart line pricing and quantity rules
//! - [`checkout`] - Turning cart lines into an order snapshot
//! - [`rating`] - Product rating aggregation over approved reviews

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod rating;
pub mod types;

pub use cart::{CartError, CartLine, CartTotals, MAX_LINE_QUANTITY, QuantityUpdate, validate_add_quantity};
pub use checkout::{CheckoutError, CheckoutLine, OrderDraft, OrderItemDraft};
pub use rating::{Rating, RatingError, RatingSummary};
pub use types::*;
