//! Sareine Core - Shared types library.
//!
//! This crate provides the types shared by every Sareine component:
//! - `storefront` - Cart synchronization engine, stores and the site API
//! - `cli` - Command-line tools for migrations and cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Cart arithmetic (adding, decrementing, merging)
//! lives here so it can be tested without any store in the picture.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and roles
//! - [`cart`] - Cart lines and cart operations
//! - [`identity`] - Anonymous vs signed-in shopper
//! - [`document`] - The per-user document kept in the remote store
//! - [`settings`] - Site-wide switches served to every client
//! - [`preorder`] - Preorders placed from a cart and their status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod document;
pub mod identity;
pub mod preorder;
pub mod settings;
pub mod types;

pub use cart::{Cart, CartError, CartItem, ProductSnapshot};
pub use document::{DocumentState, UserDocument};
pub use identity::{AuthenticatedUser, Identity};
pub use preorder::{
    NewPreorder, PREORDER_CURRENCY, Preorder, PreorderError, PreorderItem, PreorderStatus,
    ShippingAddress,
};
pub use settings::{SiteSettings, SiteSettingsResponse};
pub use types::*;
