//! The per-user document held by the remote store.
//!
//! A user document carries profile fields and, once the user has shopped while
//! signed in, a `cart` field. Every field is optional: documents written by
//! older clients, or created at sign-up before any cart activity, simply lack
//! them. A document that does not exist at all is a separate state,
//! [`DocumentState::Missing`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::identity::AuthenticatedUser;
use crate::types::{Email, Role, UserId};

/// Stored fields of a user document.
///
/// The same shape doubles as a merge patch: [`UserDocument::merge`] copies
/// every field that is `Some` and leaves the rest untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<Cart>,
}

impl UserDocument {
    /// Patch carrying the profile fields of `user`.
    #[must_use]
    pub fn profile(user: &AuthenticatedUser) -> Self {
        Self {
            uid: Some(user.uid.clone()),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            ..Self::default()
        }
    }

    /// Set the cart field.
    #[must_use]
    pub fn with_cart(mut self, cart: Cart) -> Self {
        self.cart = Some(cart);
        self
    }

    /// Apply `patch`, overwriting only the fields it sets.
    pub fn merge(&mut self, patch: Self) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.uid, patch.uid);
        take(&mut self.email, patch.email);
        take(&mut self.display_name, patch.display_name);
        take(&mut self.photo_url, patch.photo_url);
        take(&mut self.role, patch.role);
        take(&mut self.created_at, patch.created_at);
        take(&mut self.cart, patch.cart);
    }
}

/// Result of reading a user document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DocumentState {
    /// No document exists for the user.
    #[default]
    Missing,
    /// The document exists; its cart field may still be absent.
    Present(UserDocument),
}

impl DocumentState {
    /// The document's cart, treating a missing document or a missing cart
    /// field as an empty cart.
    #[must_use]
    pub fn cart_or_empty(&self) -> Cart {
        match self {
            Self::Present(UserDocument {
                cart: Some(cart), ..
            }) => cart.clone(),
            Self::Missing | Self::Present(_) => Cart::new(),
        }
    }

    #[must_use]
    pub const fn exists(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The document, if it exists.
    #[must_use]
    pub fn into_document(self) -> Option<UserDocument> {
        match self {
            Self::Missing => None,
            Self::Present(doc) => Some(doc),
        }
    }
}

impl From<Option<UserDocument>> for DocumentState {
    fn from(doc: Option<UserDocument>) -> Self {
        doc.map_or(Self::Missing, Self::Present)
    }
}
