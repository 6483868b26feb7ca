//! Sareine Storefront library.
//!
//! Keeps a shopper's lip-balm cart in sync across devices:
//!
//! - [`cart`] - The cart engine: guest cart on the device, account cart in
//!   the remote document store, merge on sign-in
//! - [`store`] - Storage ports and in-memory adapters
//! - [`db`] - `PostgreSQL` document store, settings and preorder repositories
//! - [`identity`] - Identity feed and first sign-in bootstrap
//! - [`settings`] - Site settings poller
//! - [`routes`] - HTTP API served by the `sareine-storefront` binary
//! - [`client`] - Shopper-side wiring of cart, identity and settings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod routes;
pub mod settings;
pub mod state;
pub mod store;

pub use cart::CartSync;
pub use client::StorefrontClient;
