//! Preorders placed from a cart while a product is not yet in stock.
//!
//! A shopper submits a [`NewPreorder`] built from their cart. The storefront
//! stores it as a [`Preorder`] with a short human reference (`PRE-…`) and
//! walks it through [`PreorderStatus`] by hand as payment and shipping
//! happen.

use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartItem};
use crate::types::{Email, EmailError, Price, PreorderId, ProductId, UserId};

/// Currency of every preorder.
pub const PREORDER_CURRENCY: &str = "INR";

/// Errors validating a preorder request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreorderError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("a preorder needs at least one item")]
    NoItems,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("invalid customer email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid status {0:?}, must be one of: {valid}", valid = PreorderStatus::names())]
    InvalidStatus(String),
}

/// Where a preorder is in its life.
///
/// Preorders normally move `pending_confirmation → payment_link_sent → paid →
/// dispatched → delivered`, but staff may set any status at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreorderStatus {
    #[default]
    PendingConfirmation,
    PaymentLinkSent,
    Paid,
    Dispatched,
    Delivered,
    Cancelled,
}

impl PreorderStatus {
    pub const ALL: [Self; 6] = [
        Self::PendingConfirmation,
        Self::PaymentLinkSent,
        Self::Paid,
        Self::Dispatched,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Stable string form, as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending_confirmation",
            Self::PaymentLinkSent => "payment_link_sent",
            Self::Paid => "paid",
            Self::Dispatched => "dispatched",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Every valid status, comma separated.
    #[must_use]
    pub fn names() -> String {
        Self::ALL.map(|status| status.as_str()).join(", ")
    }
}

impl std::fmt::Display for PreorderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PreorderStatus {
    type Err = PreorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PreorderError::InvalidStatus(s.to_string()))
    }
}

impl PreorderId {
    /// Reference for a preorder created at `at`: `PRE-` and the creation
    /// time in milliseconds, base 36, upper case.
    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self::new(format!("PRE-{}", base36_upper(at.timestamp_millis().unsigned_abs())))
    }
}

fn base36_upper(mut n: u64) -> String {
    let mut digits = Vec::new();
    loop {
        let digit = u32::try_from(n % 36)
            .ok()
            .and_then(|d| char::from_digit(d, 36))
            .unwrap_or('0');
        digits.push(digit.to_ascii_uppercase());
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

/// One product line of a preorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreorderItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: NonZeroU32,
    pub slug: String,
}

impl From<&CartItem> for PreorderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            slug: item.slug.clone(),
        }
    }
}

/// Delivery address for a preorder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl ShippingAddress {
    /// First required field left blank. The address email is optional.
    fn missing_field(&self) -> Option<&'static str> {
        [
            ("shippingAddress.name", &self.name),
            ("shippingAddress.phone", &self.phone),
            ("shippingAddress.street", &self.street),
            ("shippingAddress.city", &self.city),
            ("shippingAddress.state", &self.state),
            ("shippingAddress.zip", &self.zip),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// A preorder as submitted by a shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPreorder {
    pub user_id: UserId,
    pub items: Vec<PreorderItem>,
    pub amount: Price,
    pub shipping_address: ShippingAddress,
    pub customer_name: String,
    pub customer_email: String,
}

impl NewPreorder {
    /// A preorder for everything in `cart`, at the cart total.
    #[must_use]
    pub fn from_cart(
        user_id: UserId,
        cart: &Cart,
        shipping_address: ShippingAddress,
        customer_name: impl Into<String>,
        customer_email: &Email,
    ) -> Self {
        Self {
            user_id,
            items: cart.items().iter().map(PreorderItem::from).collect(),
            amount: cart.total(),
            shipping_address,
            customer_name: customer_name.into(),
            customer_email: customer_email.to_string(),
        }
    }

    /// Check every required field and return the parsed customer email.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<Email, PreorderError> {
        if self.user_id.as_str().trim().is_empty() {
            return Err(PreorderError::MissingField("userId"));
        }
        if self.items.is_empty() {
            return Err(PreorderError::NoItems);
        }
        if self.amount <= Price::ZERO {
            return Err(PreorderError::InvalidAmount);
        }
        if let Some(field) = self.shipping_address.missing_field() {
            return Err(PreorderError::MissingField(field));
        }
        if self.customer_name.trim().is_empty() {
            return Err(PreorderError::MissingField("customerName"));
        }
        Ok(Email::parse(&self.customer_email)?)
    }
}

/// A stored preorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preorder {
    /// Record key.
    pub id: i64,
    /// Human reference quoted to the customer.
    pub preorder_id: PreorderId,
    pub user_id: UserId,
    pub items: Vec<PreorderItem>,
    pub amount: Price,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    pub customer_name: String,
    pub customer_email: Email,
    pub status: PreorderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Preorder {
    /// Total units across all items.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity.get()))
    }
}
