//! Remote per-user document storage with change notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

use sareine_core::{DocumentState, UserDocument, UserId};

use super::StoreError;

/// Durable per-user documents with live change notifications.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the user's document once.
    async fn get(&self, user: &UserId) -> Result<DocumentState, StoreError>;

    /// Merge-write `patch` into the user's document, creating it if needed.
    ///
    /// Fields left `None` in `patch` keep their stored value. A `Some` cart
    /// replaces the whole stored cart.
    async fn set_merge(&self, user: &UserId, patch: UserDocument) -> Result<(), StoreError>;

    /// Watch the user's document.
    ///
    /// The subscription yields the current state first and then every later
    /// change, whichever client made it. Dropping the subscription detaches
    /// it.
    async fn subscribe(&self, user: &UserId) -> Result<DocumentSubscription, StoreError>;
}

/// A live feed of document states for one user.
///
/// Adapters push states from a background pump task. Dropping the
/// subscription aborts the pump.
#[derive(Debug)]
pub struct DocumentSubscription {
    updates: mpsc::Receiver<DocumentState>,
    pump: AbortHandle,
}

impl DocumentSubscription {
    /// Wrap a receiver fed by `pump`.
    #[must_use]
    pub fn new(updates: mpsc::Receiver<DocumentState>, pump: &JoinHandle<()>) -> Self {
        Self {
            updates,
            pump: pump.abort_handle(),
        }
    }

    /// Wait for the next document state. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<DocumentState> {
        self.updates.recv().await
    }
}

impl Drop for DocumentSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// =============================================================================
// MemoryDocumentStore
// =============================================================================

/// Buffered states per subscription before the pump waits for the reader.
const SUBSCRIPTION_BUFFER: usize = 16;

/// In-memory [`DocumentStore`].
///
/// Cheap to clone; clones share the same documents, so two engines built on
/// clones behave like two devices signed in to the same account.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    documents: Mutex<HashMap<UserId, UserDocument>>,
    changes: broadcast::Sender<UserId>,
    writes: AtomicUsize,
    available: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(MemoryInner {
                documents: Mutex::new(HashMap::new()),
                changes,
                writes: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Number of successful `set_merge` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make every operation fail with `StoreError::Unavailable` until
    /// switched back.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Current stored state, bypassing availability and counters.
    #[must_use]
    pub fn snapshot(&self, user: &UserId) -> DocumentState {
        self.inner.read(user)
    }

    /// Replace a document wholesale and notify subscribers, as a write from
    /// another client would. Not counted in [`Self::writes`].
    pub fn put(&self, user: &UserId, document: UserDocument) {
        self.inner
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.clone(), document);
        let _ = self.inner.changes.send(user.clone());
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ))
        }
    }
}

impl MemoryInner {
    fn read(&self, user: &UserId) -> DocumentState {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .cloned()
            .into()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user: &UserId) -> Result<DocumentState, StoreError> {
        self.check_available()?;
        Ok(self.inner.read(user))
    }

    async fn set_merge(&self, user: &UserId, patch: UserDocument) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user.clone())
            .or_default()
            .merge(patch);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.changes.send(user.clone());
        Ok(())
    }

    async fn subscribe(&self, user: &UserId) -> Result<DocumentSubscription, StoreError> {
        self.check_available()?;

        // Subscribe to changes before reading so nothing slips in between.
        let mut changes = self.inner.changes.subscribe();
        let initial = self.inner.read(user);
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let inner = Arc::clone(&self.inner);
        let user = user.clone();

        let pump = tokio::spawn(async move {
            if tx.send(initial).await.is_err() {
                return;
            }
            loop {
                let state = match changes.recv().await {
                    Ok(changed) if changed == user => inner.read(&user),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(user = %user, skipped, "Subscriber lagged, resending latest state");
                        inner.read(&user)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(state).await.is_err() {
                    break;
                }
            }
        });

        Ok(DocumentSubscription::new(rx, &pump))
    }
}
