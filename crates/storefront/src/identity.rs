//! Identity feed and first-sign-in document bootstrap.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, instrument};

use sareine_core::{AuthenticatedUser, Identity, Role, UserDocument};

use crate::store::{DocumentStore, StoreError};

/// Publishes the current shopper identity.
///
/// The auth layer calls [`IdentitySource::sign_in`] and
/// [`IdentitySource::sign_out`]; the cart engine follows the receiver from
/// [`IdentitySource::subscribe`].
#[derive(Debug)]
pub struct IdentitySource {
    tx: watch::Sender<Identity>,
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource {
    /// Start anonymous.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Identity::Anonymous);
        Self { tx }
    }

    #[must_use]
    pub fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, user: AuthenticatedUser) {
        self.tx.send_replace(Identity::Authenticated(user));
    }

    /// Return to anonymous. Does nothing if already anonymous.
    pub fn sign_out(&self) {
        self.tx.send_if_modified(|identity| {
            let was_signed_in = matches!(identity, Identity::Authenticated(_));
            *identity = Identity::Anonymous;
            was_signed_in
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }
}

/// Create `user`'s document on first sign-in.
///
/// A new document gets the user's profile fields, the customer role and a
/// creation time. An existing document is left untouched. Returns whether a
/// document was created.
///
/// # Errors
///
/// Returns `StoreError` if the remote read or write fails.
#[instrument(skip(store, user), fields(user = %user.uid))]
pub async fn ensure_user_document(
    store: &dyn DocumentStore,
    user: &AuthenticatedUser,
) -> Result<bool, StoreError> {
    if store.get(&user.uid).await?.exists() {
        return Ok(false);
    }

    let document = UserDocument {
        role: Some(Role::Customer),
        created_at: Some(Utc::now()),
        ..UserDocument::profile(user)
    };
    store.set_merge(&user.uid, document).await?;
    info!("Created user document");
    Ok(true)
}
