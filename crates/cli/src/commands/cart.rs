//! Cart inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Print a signed-in user's stored cart
//! sareine cart show --user <uid>
//!
//! # Empty a signed-in user's stored cart
//! sareine cart clear --user <uid>
//! ```

use std::fmt::Write as _;

use sareine_core::{Cart, UserDocument, UserId};
use sareine_storefront::db::PgDocumentStore;
use sareine_storefront::store::DocumentStore;

use super::{CommandError, connect};

/// Print the user's stored cart with its count and total.
pub async fn show(user: &str) -> Result<(), CommandError> {
    let store = PgDocumentStore::new(connect().await?);
    let user = UserId::new(user);

    let state = store.get(&user).await?;
    if !state.exists() {
        return Err(CommandError::UserNotFound(user.into_inner()));
    }

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(&state.cart_or_empty()));
    }
    Ok(())
}

/// Overwrite the user's stored cart with an empty one.
///
/// Clients signed in as the user see the empty cart through their live
/// subscription.
pub async fn clear(user: &str) -> Result<(), CommandError> {
    let store = PgDocumentStore::new(connect().await?);
    let user = UserId::new(user);

    if !store.get(&user).await?.exists() {
        return Err(CommandError::UserNotFound(user.into_inner()));
    }
    store
        .set_merge(&user, UserDocument::default().with_cart(Cart::new()))
        .await?;

    tracing::info!(user = %user, "Cart cleared");
    Ok(())
}

/// One line per cart line, then the unit count and total.
fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>3} x {} ({}) @ {} = {}",
            item.quantity,
            item.name,
            item.id,
            item.price,
            item.line_total()
        );
    }
    let _ = writeln!(out, "Items: {}  Total: {}", cart.count(), cart.total());
    out
}
