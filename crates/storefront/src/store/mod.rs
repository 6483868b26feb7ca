//! Storage ports for the cart.
//!
//! Two kinds of storage back a cart:
//!
//! - [`LocalStore`] - a small synchronous key-value store on the shopper's
//!   device, used only while the shopper is anonymous.
//! - [`DocumentStore`] - the remote per-user document store with change
//!   notifications, used once the shopper signs in.
//!
//! In-memory implementations of both live here and back the tests. The
//! `PostgreSQL` document store is [`crate::db::PgDocumentStore`].

mod local;
mod remote;

pub use local::{CART_STORAGE_KEY, FileLocalStore, LocalStore, MemoryLocalStore};
pub use local::{clear_cart, load_cart, save_cart};
pub use remote::{DocumentStore, DocumentSubscription, MemoryDocumentStore};

use thiserror::Error;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing device storage failed.
    #[error("local storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored content is not valid cart or document data.
    #[error("stored data could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The remote database rejected the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored field holds a value our types reject.
    #[error("corrupt document field: {0}")]
    Corrupt(String),

    /// The key contains characters the store cannot map to a location.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
