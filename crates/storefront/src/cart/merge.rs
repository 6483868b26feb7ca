//! Folding a guest cart into the signed-in user's remote cart.

use tracing::{info, instrument, warn};

use sareine_core::{AuthenticatedUser, Cart, UserDocument};

use crate::store::{DocumentStore, LocalStore, StoreError, clear_cart, load_cart};

/// What a login merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The device held no guest cart; the remote document was not touched.
    NothingToMerge,
    /// The guest cart was written into the remote cart and cleared locally.
    Merged {
        /// Guest lines folded in.
        guest_lines: usize,
        /// The account cart as written.
        cart: Cart,
    },
}

/// Merge the device's guest cart into `user`'s remote cart.
///
/// Remote lines come first in their stored order; guest lines for products
/// already in the remote cart only add their quantity, and the rest are
/// appended in guest order. The profile fields of `user` are written along
/// with the cart. On success the guest cart is deleted from the device so a
/// later login cannot merge it again.
///
/// The remote read and write are not atomic: a write from another client
/// between them is overwritten.
///
/// # Errors
///
/// Returns `StoreError` if device storage cannot be read, or if the remote
/// read or write fails; the guest cart is then left on the device. A failure
/// to delete the guest cart after a successful remote write is also reported.
/// A guest cart that does not decode counts as empty.
#[instrument(skip(local, remote, user), fields(user = %user.uid))]
pub async fn merge_guest_cart(
    local: &dyn LocalStore,
    remote: &dyn DocumentStore,
    user: &AuthenticatedUser,
) -> Result<MergeOutcome, StoreError> {
    let guest = match load_cart(local) {
        Ok(cart) => cart,
        Err(StoreError::Decode(e)) => {
            warn!(error = %e, "Guest cart is unreadable, nothing to merge");
            Cart::new()
        }
        Err(e) => return Err(e),
    };
    if guest.is_empty() {
        return Ok(MergeOutcome::NothingToMerge);
    }

    info!(lines = guest.len(), "Merging guest cart into account cart");

    let mut merged = remote.get(&user.uid).await?.cart_or_empty();
    merged.absorb(&guest);

    remote
        .set_merge(
            &user.uid,
            UserDocument::profile(user).with_cart(merged.clone()),
        )
        .await?;

    clear_cart(local)?;

    Ok(MergeOutcome::Merged {
        guest_lines: guest.len(),
        cart: merged,
    })
}
