//! Cart line items and the arithmetic on them.
//!
//! A [`Cart`] is an ordered list of [`CartItem`]s with at most one entry per
//! product. Insertion order is display order: new products append, existing
//! products change in place. Quantities are [`NonZeroU32`], so a line that
//! would drop to zero is removed instead.
//!
//! Every mutating method reports whether the cart actually changed, which the
//! storefront uses to decide whether to notify listeners and persist.

use std::collections::HashSet;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, ProductId};

/// Errors raised when building a cart from untrusted data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// The same product appears on more than one line.
    #[error("duplicate cart line for product {0}")]
    DuplicateItem(ProductId),
}

/// Product fields captured when a shopper adds an item.
///
/// The cart never looks the product up again, so a later catalog change does
/// not alter lines already in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub slug: String,
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub quantity: NonZeroU32,
    pub slug: String,
}

impl CartItem {
    /// A single unit of `product`.
    #[must_use]
    pub fn from_snapshot(product: &ProductSnapshot) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity: NonZeroU32::MIN,
            slug: product.slug.clone(),
        }
    }

    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity.get())
    }
}

/// An ordered cart keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The line for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Add one unit of `product`, appending a new line if it is not in the
    /// cart yet.
    pub fn add(&mut self, product: &ProductSnapshot) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == product.id) {
            item.quantity = item.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem::from_snapshot(product));
        }
    }

    /// Add one unit to an existing line. Returns `false` if `id` is absent.
    pub fn increase(&mut self, id: &ProductId) -> bool {
        match self.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Take one unit off a line, removing the line when it reaches zero.
    /// Returns `false` if `id` is absent.
    pub fn decrease(&mut self, id: &ProductId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        match self
            .items
            .get(index)
            .and_then(|item| NonZeroU32::new(item.quantity.get() - 1))
        {
            Some(quantity) => {
                if let Some(item) = self.items.get_mut(index) {
                    item.quantity = quantity;
                }
            }
            None => {
                self.items.remove(index);
            }
        }
        true
    }

    /// Remove the line for `id`. Returns `false` if it was absent.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    /// Drop every line. Returns `false` if the cart was already empty.
    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty();
        self.items.clear();
        changed
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity.get()))
    }

    /// Sum of price times quantity across all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Fold `other` into this cart.
    ///
    /// Lines already present keep their name, price and image and gain
    /// `other`'s quantity; lines only in `other` are appended in `other`'s
    /// order.
    pub fn absorb(&mut self, other: &Self) {
        for incoming in &other.items {
            match self.items.iter_mut().find(|item| item.id == incoming.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(incoming.quantity.get());
                }
                None => self.items.push(incoming.clone()),
            }
        }
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = CartError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) {
                return Err(CartError::DuplicateItem(item.id.clone()));
            }
        }
        Ok(Self { items })
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
