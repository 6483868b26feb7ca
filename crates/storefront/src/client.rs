//! Shopper-side wiring.
//!
//! [`StorefrontClient`] puts together what a storefront front end runs: the
//! guest cart kept in a directory on the device, the cart engine following the
//! shopper's identity, and the site settings poller.
//!
//! ```rust,ignore
//! let client = StorefrontClient::from_env(remote)?;
//! client.start();
//! client.cart().add_to_cart(&product);
//! client.sign_in(user).await;
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use sareine_core::{AuthenticatedUser, Email, Identity, NewPreorder, ShippingAddress};

use crate::cart::CartSync;
use crate::config::{ClientConfig, ConfigError};
use crate::identity::{IdentitySource, ensure_user_document};
use crate::settings::{SettingsError, SiteSettingsPoller};
use crate::store::{DocumentStore, FileLocalStore};

/// Errors building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings poller error: {0}")]
    Settings(#[from] SettingsError),
}

/// One shopper's storefront session.
pub struct StorefrontClient {
    remote: Arc<dyn DocumentStore>,
    cart: CartSync,
    settings: SiteSettingsPoller,
    identity: IdentitySource,
}

impl StorefrontClient {
    /// Client keeping the guest cart under `config.local_storage_dir` and the
    /// signed-in cart in `remote`. Starts anonymous and not polling.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Settings` if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, remote: Arc<dyn DocumentStore>) -> Result<Self, ClientError> {
        let local = Arc::new(FileLocalStore::new(config.local_storage_dir.clone()));
        let cart = CartSync::new(local, Arc::clone(&remote));
        let settings = SiteSettingsPoller::new(config)?;

        Ok(Self {
            remote,
            cart,
            settings,
            identity: IdentitySource::new(),
        })
    }

    /// [`Self::new`] with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the configuration is invalid or the HTTP
    /// client fails to build.
    pub fn from_env(remote: Arc<dyn DocumentStore>) -> Result<Self, ClientError> {
        Self::new(&ClientConfig::from_env()?, remote)
    }

    /// Start polling site settings.
    pub fn start(&self) {
        self.settings.start();
    }

    #[must_use]
    pub const fn cart(&self) -> &CartSync {
        &self.cart
    }

    #[must_use]
    pub const fn settings(&self) -> &SiteSettingsPoller {
        &self.settings
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentitySource {
        &self.identity
    }

    /// Sign `user` in. Returns once the cart shows the account cart.
    ///
    /// The user's document is created on first sign-in. Failing to create
    /// it is logged and does not stop the sign-in.
    pub async fn sign_in(&self, user: AuthenticatedUser) {
        match ensure_user_document(self.remote.as_ref(), &user).await {
            Ok(true) => info!(user = %user.uid, "First sign-in"),
            Ok(false) => {}
            Err(e) => warn!(user = %user.uid, error = %e, "Could not create user document"),
        }

        self.identity.sign_in(user.clone());
        self.cart.set_identity(Identity::Authenticated(user)).await;
    }

    /// Sign out. Returns once the cart shows the guest cart again.
    pub async fn sign_out(&self) {
        self.identity.sign_out();
        self.cart.set_identity(Identity::Anonymous).await;
    }

    /// Whether the storefront is currently taking preorders.
    #[must_use]
    pub fn preorders_open(&self) -> bool {
        self.settings.current().settings.preorder_enabled
    }

    /// A preorder for the signed-in shopper's current cart. `None` when
    /// nobody is signed in or the cart is empty.
    pub async fn preorder_for(
        &self,
        shipping_address: ShippingAddress,
        customer_name: &str,
        customer_email: &Email,
    ) -> Option<NewPreorder> {
        let Identity::Authenticated(user) = self.cart.identity().await else {
            return None;
        };
        let cart = self.cart.cart();
        if cart.is_empty() {
            return None;
        }
        Some(NewPreorder::from_cart(
            user.uid,
            &cart,
            shipping_address,
            customer_name,
            customer_email,
        ))
    }

    /// Stop polling and stop following the remote store. Queued cart writes
    /// finish first.
    pub async fn shutdown(&self) {
        self.settings.stop();
        self.cart.shutdown().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sareine_core::{Price, ProductId, ProductSnapshot, Role, UserId};
    use url::Url;

    use super::*;
    use crate::store::MemoryDocumentStore;

    fn config(dir: &std::path::Path, preorder_fallback: bool) -> ClientConfig {
        ClientConfig {
            preorder_fallback,
            ..ClientConfig::new(
                dir,
                Url::parse("http://127.0.0.1:9/api/site-settings").unwrap(),
            )
        }
    }

    fn rose() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new("rose"),
            name: "Rose Lip Balm".to_string(),
            price: Price::from_rupees(599),
            image: "/images/rose.png".to_string(),
            slug: "rose-lip-balm".to_string(),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Asha Rao".to_string(),
            phone: "+91 98450 00000".to_string(),
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            zip: "560001".to_string(),
            ..ShippingAddress::default()
        }
    }

    #[tokio::test]
    async fn test_guest_cart_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryDocumentStore::new());

        let client = StorefrontClient::new(&config(dir.path(), false), remote.clone()).unwrap();
        client.cart().add_to_cart(&rose());
        client.shutdown().await;
        drop(client);

        let client = StorefrontClient::new(&config(dir.path(), false), remote).unwrap();
        assert_eq!(client.cart().cart_count(), 1);
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_document_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryDocumentStore::new());
        let client = StorefrontClient::new(&config(dir.path(), false), remote.clone()).unwrap();
        client.cart().add_to_cart(&rose());

        client.sign_in(AuthenticatedUser::new("u1")).await;

        let document = remote
            .snapshot(&UserId::new("u1"))
            .into_document()
            .unwrap();
        assert_eq!(document.role, Some(Role::Customer));
        assert!(document.created_at.is_some());
        assert_eq!(document.cart.unwrap().count(), 1);
        assert_eq!(client.cart().cart_count(), 1);
        assert!(client.identity().current().user().is_some());

        client.sign_out().await;
        assert_eq!(client.identity().current(), Identity::Anonymous);
        assert_eq!(client.cart().cart_count(), 0);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_in_proceeds_when_store_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryDocumentStore::new());
        remote.set_available(false);
        let client = StorefrontClient::new(&config(dir.path(), false), remote.clone()).unwrap();

        client.sign_in(AuthenticatedUser::new("u1")).await;

        assert!(client.identity().current().user().is_some());
        assert!(!remote.snapshot(&UserId::new("u1")).exists());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_preorders_open_follows_fallback_until_settings_load() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryDocumentStore::new());

        let open = StorefrontClient::new(&config(dir.path(), true), remote.clone()).unwrap();
        let closed = StorefrontClient::new(&config(dir.path(), false), remote).unwrap();

        open.start();
        // Unreachable endpoint: the failed fetch keeps the fallback.
        let _ = open.settings().refresh().await;
        assert!(open.preorders_open());
        assert!(!closed.preorders_open());
        open.shutdown().await;
    }

    #[tokio::test]
    async fn test_preorder_needs_signed_in_shopper_and_items() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryDocumentStore::new());
        let client = StorefrontClient::new(&config(dir.path(), true), remote).unwrap();
        let email = Email::parse("asha@sareine.in").unwrap();

        client.cart().add_to_cart(&rose());
        assert!(
            client
                .preorder_for(address(), "Asha Rao", &email)
                .await
                .is_none()
        );

        client.sign_in(AuthenticatedUser::new("u1")).await;
        let preorder = client
            .preorder_for(address(), "Asha Rao", &email)
            .await
            .unwrap();
        assert_eq!(preorder.user_id.as_str(), "u1");
        assert_eq!(preorder.amount, Price::from_rupees(599));
        assert_eq!(preorder.validate().unwrap(), email);

        client.cart().clear_cart();
        assert!(
            client
                .preorder_for(address(), "Asha Rao", &email)
                .await
                .is_none()
        );
        client.shutdown().await;
    }
}
