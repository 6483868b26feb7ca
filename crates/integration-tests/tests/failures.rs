//! Storage failures never surface to the shopper.

#![allow(clippy::unwrap_used)]

use sareine_core::{AuthenticatedUser, Cart, ProductId, UserDocument};
use sareine_integration_tests::{Device, balm, quantity_of};
use sareine_storefront::store::{CART_STORAGE_KEY, LocalStore, MemoryDocumentStore};

#[tokio::test]
async fn test_failed_merge_keeps_guest_cart_for_next_sign_in() {
    let backend = MemoryDocumentStore::new();
    let user = AuthenticatedUser::new("ravi");
    let device = Device::new(&backend);
    device.sync.add_to_cart(&balm("rose", 599));
    backend.set_available(false);

    device.sign_in(&user).await;

    // The account cart is unknown, and the guest cart must not stand in for
    // it or it would be merged twice.
    assert_eq!(backend.writes(), 0);
    assert!(device.local.peek(CART_STORAGE_KEY).is_some());
    assert!(device.sync.cart().is_empty());

    backend.set_available(true);
    device.sign_out().await;
    assert_eq!(quantity_of(&device.sync.cart(), "rose"), 1);
    device.sign_in(&user).await;

    assert_eq!(quantity_of(&backend.snapshot(&user.uid).cart_or_empty(), "rose"), 1);
    assert!(device.local.peek(CART_STORAGE_KEY).is_none());
}

#[tokio::test]
async fn test_failed_remote_write_keeps_optimistic_cart() {
    let backend = MemoryDocumentStore::new();
    let user = AuthenticatedUser::new("ravi");
    let mut account = Cart::new();
    account.add(&balm("gift-box", 2999));
    backend.put(&user.uid, UserDocument::default().with_cart(account));
    let device = Device::new(&backend);
    device.sign_in(&user).await;
    device.wait_for_cart(|c| quantity_of(c, "gift-box") == 1).await;
    backend.set_available(false);

    device.sync.add_to_cart(&balm("rose", 599));
    device.sync.flush().await;

    assert_eq!(quantity_of(&device.sync.cart(), "rose"), 1);
    assert_eq!(backend.writes(), 0);
    assert_eq!(quantity_of(&backend.snapshot(&user.uid).cart_or_empty(), "rose"), 0);

    // The next successful write carries the whole cart.
    backend.set_available(true);
    device.sync.increase_quantity(&ProductId::new("rose"));
    device.sync.flush().await;
    let stored = backend.snapshot(&user.uid).cart_or_empty();
    assert_eq!(quantity_of(&stored, "rose"), 2);
    assert_eq!(quantity_of(&stored, "gift-box"), 1);
}

#[tokio::test]
async fn test_unreadable_guest_cart_starts_empty_and_is_replaced() {
    let backend = MemoryDocumentStore::new();
    let device = Device::new(&backend);
    device.local.set(CART_STORAGE_KEY, "{\"broken\":").unwrap();
    let device = Device::with_storage(device.local, &backend);

    assert!(device.sync.cart().is_empty());

    device.sync.add_to_cart(&balm("mint", 499));
    let stored = device.local.peek(CART_STORAGE_KEY).unwrap();
    assert!(stored.contains("\"mint\""));
}

#[tokio::test]
async fn test_failed_subscription_leaves_engine_usable() {
    let backend = MemoryDocumentStore::new();
    let user = AuthenticatedUser::new("ravi");
    let device = Device::new(&backend);
    backend.set_available(false);

    device.sign_in(&user).await;
    backend.set_available(true);

    device.sync.add_to_cart(&balm("rose", 599));
    device.sync.flush().await;

    assert_eq!(quantity_of(&backend.snapshot(&user.uid).cart_or_empty(), "rose"), 1);
    assert_eq!(device.local.writes(), 0);
}
