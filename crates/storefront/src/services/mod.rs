//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, email verification and password login
//! - `cart` - Cart ownership (user or session) and cart rules
//! - `checkout` - Checkout form validation and order placement
//! - `contact` - Contact form validation and storage
//! - `reviews` - Review submission, deletion and moderation

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod reviews;
