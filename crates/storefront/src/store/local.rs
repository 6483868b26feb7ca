//! Device-local key-value storage.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use sareine_core::Cart;

use super::StoreError;

/// Key under which the anonymous cart is stored.
pub const CART_STORAGE_KEY: &str = "sareine_cart";

/// Synchronous string key-value storage scoped to one device.
pub trait LocalStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read the anonymous cart. An absent entry is an empty cart.
///
/// # Errors
///
/// Returns `StoreError::Decode` if the stored text is not a valid cart, or
/// any error the store raises while reading.
pub fn load_cart(store: &dyn LocalStore) -> Result<Cart, StoreError> {
    match store.get(CART_STORAGE_KEY)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Cart::new()),
    }
}

/// Overwrite the anonymous cart with `cart`.
///
/// # Errors
///
/// Returns any error the store raises while writing.
pub fn save_cart(store: &dyn LocalStore, cart: &Cart) -> Result<(), StoreError> {
    let json = serde_json::to_string(cart)?;
    store.set(CART_STORAGE_KEY, &json)
}

/// Delete the anonymous cart entry.
///
/// # Errors
///
/// Returns any error the store raises while writing.
pub fn clear_cart(store: &dyn LocalStore) -> Result<(), StoreError> {
    store.remove(CART_STORAGE_KEY)
}

// =============================================================================
// MemoryLocalStore
// =============================================================================

/// In-memory [`LocalStore`] that counts accesses.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` and `remove` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw stored value, without counting as a read.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.peek(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// FileLocalStore
// =============================================================================

/// [`LocalStore`] keeping one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    /// Store files under `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use sareine_core::{CartItem, Price, ProductId};

    use super::*;

    /// A price with paise, which must survive the float encoding intact.
    fn gift_price() -> Price {
        serde_json::from_str("2999.5").unwrap()
    }

    fn sample_cart() -> Cart {
        Cart::try_from(vec![
            CartItem {
                id: ProductId::new("rose"),
                name: "Rose Lip Balm".to_string(),
                price: Price::from_rupees(599),
                image: "/images/rose.png".to_string(),
                quantity: NonZeroU32::new(2).unwrap(),
                slug: "rose-lip-balm".to_string(),
            },
            CartItem {
                id: ProductId::new("gift"),
                name: "Gift Box".to_string(),
                price: gift_price(),
                image: "/images/gift.png".to_string(),
                quantity: NonZeroU32::new(1).unwrap(),
                slug: "gift-box".to_string(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_load_absent_is_empty() {
        let store = MemoryLocalStore::new();
        assert!(load_cart(&store).unwrap().is_empty());
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let store = MemoryLocalStore::new();
        store.set(CART_STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(load_cart(&store), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_memory_roundtrip_and_clear() {
        let store = MemoryLocalStore::new();
        save_cart(&store, &sample_cart()).unwrap();
        assert_eq!(load_cart(&store).unwrap(), sample_cart());

        clear_cart(&store).unwrap();
        assert!(store.peek(CART_STORAGE_KEY).is_none());
        assert_eq!(store.writes(), 2);
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_reads_web_client_format() {
        let store = MemoryLocalStore::new();
        store
            .set(
                CART_STORAGE_KEY,
                r#"[{"id":"rose","name":"Rose Lip Balm","price":599,"image":"/images/rose.png","quantity":2,"slug":"rose-lip-balm"}]"#,
            )
            .unwrap();

        let cart = load_cart(&store).unwrap();
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.total(), Price::from_rupees(1198));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("storage"));

        assert!(load_cart(&store).unwrap().is_empty());
        save_cart(&store, &sample_cart()).unwrap();

        let reopened = FileLocalStore::new(dir.path().join("storage"));
        let loaded = load_cart(&reopened).unwrap();
        assert_eq!(loaded, sample_cart());
        assert_eq!(loaded.items()[1].price.to_string(), "₹2999.5");

        clear_cart(&reopened).unwrap();
        clear_cart(&reopened).unwrap();
        assert!(load_cart(&reopened).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
