//! Integration tests for Sareine cart synchronization.
//!
//! Scenarios run the real [`CartSync`] engine against the in-memory stores.
//! A [`Device`] is one shopper device: its own local storage and engine. Two
//! devices built on clones of one [`MemoryDocumentStore`] share an account
//! backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sareine-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use sareine_core::{AuthenticatedUser, Cart, Identity, Price, ProductId, ProductSnapshot};
use sareine_storefront::CartSync;
use sareine_storefront::store::{MemoryDocumentStore, MemoryLocalStore};

/// How long a scenario waits for a remote change to arrive.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// One shopper device.
pub struct Device {
    pub local: Arc<MemoryLocalStore>,
    pub sync: CartSync,
}

impl Device {
    /// A fresh device talking to `backend`.
    #[must_use]
    pub fn new(backend: &MemoryDocumentStore) -> Self {
        Self::with_storage(Arc::new(MemoryLocalStore::new()), backend)
    }

    /// A device with pre-filled local storage.
    #[must_use]
    pub fn with_storage(local: Arc<MemoryLocalStore>, backend: &MemoryDocumentStore) -> Self {
        let sync = CartSync::new(local.clone(), Arc::new(backend.clone()));
        Self { local, sync }
    }

    pub async fn sign_in(&self, user: &AuthenticatedUser) {
        self.sync
            .set_identity(Identity::Authenticated(user.clone()))
            .await;
    }

    pub async fn sign_out(&self) {
        self.sync.set_identity(Identity::Anonymous).await;
    }

    /// Wait until the device's cart satisfies `ready`, returning that cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart does not get there within [`SYNC_TIMEOUT`].
    pub async fn wait_for_cart(&self, ready: impl FnMut(&Cart) -> bool) -> Cart {
        let mut updates = self.sync.subscribe();
        let waited = tokio::time::timeout(SYNC_TIMEOUT, updates.wait_for(ready)).await;
        match waited {
            Ok(Ok(cart)) => cart.clone(),
            Ok(Err(_)) => panic!("cart channel closed"),
            Err(_) => panic!("timed out waiting for cart; last seen {:?}", self.sync.cart()),
        }
    }
}

/// A catalogue product.
#[must_use]
pub fn balm(id: &str, rupees: i64) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(id),
        name: format!("{id} lip balm"),
        price: Price::from_rupees(rupees),
        image: format!("/images/{id}.webp"),
        slug: format!("{id}-lip-balm"),
    }
}

/// Quantity of `id` in `cart`, zero if absent.
#[must_use]
pub fn quantity_of(cart: &Cart, id: &str) -> u32 {
    cart.get(&ProductId::new(id)).map_or(0, |item| item.quantity.get())
}
