//! Cart synchronization engine.
//!
//! [`CartSync`] owns the shopper's cart and keeps it in step with the right
//! store for the current identity:
//!
//! - **Anonymous** - the cart lives in device storage ([`LocalStore`]). Every
//!   mutation writes the full cart back synchronously.
//! - **Signed in** - the cart lives in the user's remote document
//!   ([`DocumentStore`]). A live subscription replaces the in-memory cart on
//!   every remote change, from this client or another one, and every mutation
//!   queues a full-cart merge-write.
//!
//! On the anonymous to signed-in transition the guest cart is merged into the
//! account cart once ([`merge_guest_cart`]) before the subscription starts.
//! When sign-in completes the in-memory cart already is the account cart, so
//! nothing stale can be written over it.
//!
//! # Mutations
//!
//! Mutations never await and never fail. The new cart is computed and
//! published to watchers first; persistence follows. Persistence failures
//! are logged and the in-memory cart stays ahead of the store.
//!
//! # Example
//!
//! ```rust,ignore
//! let sync = CartSync::new(Arc::new(FileLocalStore::new(".sareine")), remote);
//! tokio::spawn({
//!     let sync = sync.clone();
//!     async move { sync.run(identity.subscribe()).await }
//! });
//!
//! sync.add_to_cart(&product);
//! assert_eq!(sync.cart_count(), 1);
//! ```

mod merge;
mod writer;

pub use merge::{MergeOutcome, merge_guest_cart};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use sareine_core::{
    AuthenticatedUser, Cart, Email, Identity, Price, ProductId, ProductSnapshot, UserDocument,
    UserId,
};

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::store::{DocumentStore, DocumentSubscription, LocalStore, load_cart, save_cart};
use writer::RemoteWriter;

/// Where cart writes currently go.
enum Mode {
    /// Device storage.
    Local,
    /// Signing in; the account cart is not known yet. Mutations are kept and
    /// replayed onto it.
    SigningIn(Vec<CartOp>),
    /// The signed-in user's remote document.
    Remote(RemoteMode),
    /// Shut down; mutations stay in memory.
    Detached,
}

/// One shopper action on the cart.
#[derive(Debug, Clone)]
enum CartOp {
    Add(ProductSnapshot),
    Increase(ProductId),
    Decrease(ProductId),
    Remove(ProductId),
    Clear,
}

impl CartOp {
    const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add_to_cart",
            Self::Increase(_) => "increase_quantity",
            Self::Decrease(_) => "decrease_quantity",
            Self::Remove(_) => "remove_from_cart",
            Self::Clear => "clear_cart",
        }
    }

    const fn product(&self) -> Option<&ProductId> {
        match self {
            Self::Add(product) => Some(&product.id),
            Self::Increase(id) | Self::Decrease(id) | Self::Remove(id) => Some(id),
            Self::Clear => None,
        }
    }

    /// Apply to `cart`. Returns whether the result must be persisted; a
    /// clear always is, even on an empty cart.
    fn apply(&self, cart: &mut Cart) -> bool {
        match self {
            Self::Add(product) => {
                cart.add(product);
                true
            }
            Self::Increase(id) => cart.increase(id),
            Self::Decrease(id) => cart.decrease(id),
            Self::Remove(id) => cart.remove(id),
            Self::Clear => {
                cart.clear();
                true
            }
        }
    }
}

struct RemoteMode {
    user: AuthenticatedUser,
    writer: RemoteWriter,
    listener: Option<JoinHandle<()>>,
}

/// The shopper's cart, kept in sync with local or remote storage.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<Inner>,
}

struct Inner {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn DocumentStore>,
    cart: Arc<watch::Sender<Cart>>,
    panel_open: watch::Sender<bool>,
    mode: Mutex<Mode>,
    /// Held for the whole of an identity transition.
    identity: tokio::sync::Mutex<Identity>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mode = self.mode.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Mode::Remote(RemoteMode {
            listener: Some(listener),
            ..
        }) = mode
        {
            listener.abort();
        }
    }
}

impl CartSync {
    /// Create an anonymous cart loaded from device storage.
    ///
    /// An unreadable stored cart is logged and replaced by an empty one.
    #[must_use]
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn DocumentStore>) -> Self {
        let initial = read_guest_cart(local.as_ref());
        let (cart, _) = watch::channel(initial);
        let (panel_open, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                cart: Arc::new(cart),
                panel_open,
                mode: Mutex::new(Mode::Local),
                identity: tokio::sync::Mutex::new(Identity::Anonymous),
            }),
        }
    }

    fn lock_mode(&self) -> MutexGuard<'_, Mode> {
        self.inner
            .mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.cart.borrow().clone()
    }

    /// Total units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.inner.cart.borrow().count()
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.inner.cart.borrow().total()
    }

    /// Receiver notified on every cart change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.cart.subscribe()
    }

    /// Whether the cart panel is showing.
    #[must_use]
    pub fn is_cart_open(&self) -> bool {
        *self.inner.panel_open.borrow()
    }

    /// Receiver notified when the cart panel opens or closes.
    #[must_use]
    pub fn watch_panel(&self) -> watch::Receiver<bool> {
        self.inner.panel_open.subscribe()
    }

    /// Identity the cart is currently following.
    pub async fn identity(&self) -> Identity {
        self.inner.identity.lock().await.clone()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product` and open the cart panel.
    pub fn add_to_cart(&self, product: &ProductSnapshot) {
        self.mutate(CartOp::Add(product.clone()));
        self.set_cart_open(true);
    }

    /// Add one unit of a product already in the cart. No-op if absent.
    pub fn increase_quantity(&self, id: &ProductId) {
        self.mutate(CartOp::Increase(id.clone()));
    }

    /// Remove a line. No-op if absent.
    pub fn remove_from_cart(&self, id: &ProductId) {
        self.mutate(CartOp::Remove(id.clone()));
    }

    /// Take one unit off a line, removing it at zero. No-op if absent.
    pub fn decrease_quantity(&self, id: &ProductId) {
        self.mutate(CartOp::Decrease(id.clone()));
    }

    /// Empty the cart. Always persisted, even if already empty.
    pub fn clear_cart(&self) {
        self.mutate(CartOp::Clear);
    }

    /// Flip the cart panel.
    pub fn toggle_cart(&self) {
        self.inner.panel_open.send_modify(|open| *open = !*open);
    }

    /// Show or hide the cart panel.
    pub fn set_cart_open(&self, open: bool) {
        self.inner.panel_open.send_if_modified(|current| {
            let changed = *current != open;
            *current = open;
            changed
        });
    }

    /// Apply `op` to the cart and persist the result if it reports a change.
    ///
    /// The mode lock is held from the in-memory update through enqueueing the
    /// write, so writes are issued in the same order as updates.
    fn mutate(&self, op: CartOp) {
        let mut mode = self.lock_mode();
        let mut updated = None;
        self.inner.cart.send_if_modified(|cart| {
            let changed = op.apply(cart);
            if changed {
                updated = Some(cart.clone());
            }
            changed
        });

        let Some(cart) = updated else {
            debug!(action = op.name(), product = ?op.product(), "Cart unchanged");
            return;
        };
        match op.product() {
            Some(id) => add_breadcrumb("cart", op.name(), Some(&[("product_id", id.as_str())])),
            None => add_breadcrumb("cart", op.name(), None),
        }
        self.persist(&mut mode, op, cart);
    }

    fn persist(&self, mode: &mut Mode, op: CartOp, cart: Cart) {
        match mode {
            Mode::Local => {
                if let Err(e) = save_cart(self.inner.local.as_ref(), &cart) {
                    error!(error = %e, "Failed to save guest cart");
                }
            }
            Mode::SigningIn(pending) => {
                debug!(action = op.name(), "Sign-in in progress, change held for the account cart");
                pending.push(op);
            }
            Mode::Remote(remote) => {
                remote
                    .writer
                    .enqueue(UserDocument::profile(&remote.user).with_cart(cart));
            }
            Mode::Detached => debug!("Cart is detached, change kept in memory only"),
        }
    }

    // =========================================================================
    // Identity transitions
    // =========================================================================

    /// Follow an identity feed until its sender is dropped.
    pub async fn run(&self, mut identity: watch::Receiver<Identity>) {
        loop {
            let next = identity.borrow_and_update().clone();
            self.set_identity(next).await;
            if identity.changed().await.is_err() {
                debug!("Identity feed closed, cart stops following");
                return;
            }
        }
    }

    /// Switch the cart to the storage for `identity`.
    ///
    /// Switching to the identity already in effect only refreshes profile
    /// fields. Otherwise the previous remote subscription is fully stopped
    /// before the new mode starts. Signing in merges the guest cart and then
    /// subscribes; when it returns the cart is the account cart. Signing out
    /// reloads the guest cart from device storage.
    #[instrument(skip_all, fields(identity = %describe(&identity)))]
    pub async fn set_identity(&self, identity: Identity) {
        let mut current = self.inner.identity.lock().await;

        if current.same_storage(&identity) {
            if let (Identity::Authenticated(user), Mode::Remote(remote)) =
                (&identity, &mut *self.lock_mode())
            {
                remote.user = user.clone();
            }
            *current = identity;
            return;
        }

        self.stop_listener().await;

        let previous = match &identity {
            Identity::Anonymous => {
                clear_sentry_user();
                self.activate_local()
            }
            Identity::Authenticated(user) => {
                set_sentry_user(&user.uid, user.email.as_ref().map(Email::as_str));
                self.activate_remote(user).await
            }
        };
        if let Mode::Remote(old) = previous {
            old.writer.close().await;
        }

        *current = identity;
    }

    /// Wait until every remote write queued so far has been attempted.
    pub async fn flush(&self) {
        let pending = match &*self.lock_mode() {
            Mode::Remote(remote) => Some(remote.writer.flush()),
            Mode::Local | Mode::SigningIn(_) | Mode::Detached => None,
        };
        if let Some(pending) = pending {
            pending.await;
        }
    }

    /// Stop following any store: cancel the subscription and finish queued
    /// writes. Later mutations stay in memory.
    pub async fn shutdown(&self) {
        let _identity = self.inner.identity.lock().await;
        self.stop_listener().await;
        let previous = std::mem::replace(&mut *self.lock_mode(), Mode::Detached);
        if let Mode::Remote(old) = previous {
            old.writer.close().await;
        }
        info!("Cart sync shut down");
    }

    /// Abort the remote listener, if any, and wait until it has stopped.
    async fn stop_listener(&self) {
        let listener = match &mut *self.lock_mode() {
            Mode::Remote(remote) => remote.listener.take(),
            Mode::Local | Mode::SigningIn(_) | Mode::Detached => None,
        };
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }
    }

    /// Switch to device storage and reload the guest cart. Returns the
    /// previous mode.
    fn activate_local(&self) -> Mode {
        let mut mode = self.lock_mode();
        let guest = read_guest_cart(self.inner.local.as_ref());
        info!(lines = guest.len(), "Cart following device storage");
        self.inner.cart.send_replace(guest);
        std::mem::replace(&mut *mode, Mode::Local)
    }

    /// Switch to `user`'s remote document: merge the guest cart, publish the
    /// account cart, then subscribe. Returns the previous mode.
    ///
    /// Until the account cart is known, mutations only touch memory and are
    /// replayed onto it afterwards; a previous user's cart is hidden at once.
    async fn activate_remote(&self, user: &AuthenticatedUser) -> Mode {
        let previous = std::mem::replace(&mut *self.lock_mode(), Mode::SigningIn(Vec::new()));
        if matches!(previous, Mode::Remote(_)) {
            self.inner.cart.send_replace(Cart::new());
        }

        let account = self.account_cart(user).await;
        let writer = RemoteWriter::spawn(Arc::clone(&self.inner.remote), user.uid.clone());
        {
            let mut mode = self.lock_mode();
            let pending = match std::mem::replace(&mut *mode, Mode::Detached) {
                Mode::SigningIn(pending) => pending,
                Mode::Local | Mode::Remote(_) | Mode::Detached => Vec::new(),
            };
            let (cart, changed) = replay(account, &pending);
            if changed {
                debug!(held = pending.len(), "Writing changes made during sign-in");
                writer.enqueue(UserDocument::profile(user).with_cart(cart.clone()));
            }
            self.inner.cart.send_replace(cart);
            *mode = Mode::Remote(RemoteMode {
                user: user.clone(),
                writer,
                listener: None,
            });
        }

        match self.inner.remote.subscribe(&user.uid).await {
            Ok(subscription) => {
                let listener = follow(
                    Arc::clone(&self.inner.cart),
                    subscription,
                    user.uid.clone(),
                );
                if let Mode::Remote(remote) = &mut *self.lock_mode() {
                    remote.listener = Some(listener);
                }
                info!("Cart following account document");
            }
            Err(e) => error!(error = %e, "Failed to subscribe to account cart"),
        }

        previous
    }

    /// The account cart at sign-in: the merge result, or the stored cart
    /// when there was nothing to merge. Empty if neither can be obtained.
    async fn account_cart(&self, user: &AuthenticatedUser) -> Cart {
        match merge_guest_cart(self.inner.local.as_ref(), self.inner.remote.as_ref(), user).await
        {
            Ok(MergeOutcome::Merged { guest_lines, cart }) => {
                info!(guest_lines, lines = cart.len(), "Guest cart merged into account");
                return cart;
            }
            Ok(MergeOutcome::NothingToMerge) => debug!("No guest cart to merge"),
            Err(e) => error!(error = %e, "Failed to merge guest cart into account"),
        }

        match self.inner.remote.get(&user.uid).await {
            Ok(state) => state.cart_or_empty(),
            Err(e) => {
                error!(error = %e, "Failed to read account cart, starting empty");
                Cart::new()
            }
        }
    }
}

/// Apply `ops` in order to `cart`. Reports whether any of them changed it.
fn replay(mut cart: Cart, ops: &[CartOp]) -> (Cart, bool) {
    let mut changed = false;
    for op in ops {
        changed |= op.apply(&mut cart);
    }
    (cart, changed)
}

/// Replace the in-memory cart with every state the subscription yields.
fn follow(
    cart: Arc<watch::Sender<Cart>>,
    mut subscription: DocumentSubscription,
    user: UserId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(state) = subscription.next().await {
            let next = state.cart_or_empty();
            debug!(user = %user, lines = next.len(), "Account cart changed");
            cart.send_replace(next);
        }
        warn!(user = %user, "Account cart subscription ended");
    })
}

fn read_guest_cart(local: &dyn LocalStore) -> Cart {
    load_cart(local).unwrap_or_else(|e| {
        warn!(error = %e, "Stored guest cart is unreadable, starting with an empty cart");
        Cart::new()
    })
}

fn describe(identity: &Identity) -> String {
    identity
        .user()
        .map_or_else(|| "anonymous".to_string(), |user| user.uid.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use sareine_core::DocumentState;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::store::{
        CART_STORAGE_KEY, MemoryDocumentStore, MemoryLocalStore, StoreError,
    };

    /// Document store whose reads wait until the gate is opened.
    struct GatedStore {
        inner: MemoryDocumentStore,
        gate: Semaphore,
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        async fn get(&self, user: &UserId) -> Result<DocumentState, StoreError> {
            let _open = self
                .gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            self.inner.get(user).await
        }

        async fn set_merge(&self, user: &UserId, patch: UserDocument) -> Result<(), StoreError> {
            self.inner.set_merge(user, patch).await
        }

        async fn subscribe(&self, user: &UserId) -> Result<DocumentSubscription, StoreError> {
            self.inner.subscribe(user).await
        }
    }

    fn cart_of(products: &[ProductSnapshot]) -> Cart {
        let mut cart = Cart::new();
        for product in products {
            cart.add(product);
        }
        cart
    }

    fn quantity(cart: &Cart, id: &str) -> u32 {
        cart.get(&ProductId::new(id)).map_or(0, |item| item.quantity.get())
    }

    fn product(id: &str, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("Balm {id}"),
            price: Price::from_rupees(price),
            image: format!("/images/{id}.png"),
            slug: id.to_string(),
        }
    }

    fn engine() -> (CartSync, Arc<MemoryLocalStore>, MemoryDocumentStore) {
        let local = Arc::new(MemoryLocalStore::new());
        let remote = MemoryDocumentStore::new();
        let sync = CartSync::new(local.clone(), Arc::new(remote.clone()));
        (sync, local, remote)
    }

    #[tokio::test]
    async fn test_anonymous_mutations_write_device_storage_only() {
        let (sync, local, remote) = engine();

        sync.add_to_cart(&product("rose", 599));
        sync.add_to_cart(&product("rose", 599));
        sync.add_to_cart(&product("gift", 2999));

        assert_eq!(sync.cart_count(), 3);
        assert_eq!(sync.cart_total(), Price::from_rupees(4197));
        assert_eq!(local.writes(), 3);
        assert_eq!(remote.writes(), 0);

        let stored: Cart = serde_json::from_str(&local.peek(CART_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(stored, sync.cart());
    }

    #[tokio::test]
    async fn test_initial_load_does_not_write_back() {
        let local = Arc::new(MemoryLocalStore::new());
        let mut cart = Cart::new();
        cart.add(&product("rose", 599));
        crate::store::save_cart(local.as_ref(), &cart).unwrap();

        let sync = CartSync::new(local.clone(), Arc::new(MemoryDocumentStore::new()));
        sync.set_identity(Identity::Anonymous).await;

        assert_eq!(sync.cart(), cart);
        assert_eq!(local.writes(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_guest_cart_starts_empty() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set(CART_STORAGE_KEY, "not a cart").unwrap();

        let sync = CartSync::new(local, Arc::new(MemoryDocumentStore::new()));

        assert!(sync.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_opens_panel_and_toggle_flips() {
        let (sync, _, _) = engine();
        assert!(!sync.is_cart_open());

        sync.add_to_cart(&product("rose", 599));
        assert!(sync.is_cart_open());

        sync.toggle_cart();
        assert!(!sync.is_cart_open());

        sync.increase_quantity(&ProductId::new("rose"));
        assert!(!sync.is_cart_open());
        assert_eq!(sync.cart_count(), 2);
    }

    #[tokio::test]
    async fn test_noop_mutations_do_not_persist() {
        let (sync, local, _) = engine();
        sync.add_to_cart(&product("rose", 599));
        let writes = local.writes();
        let before = sync.cart();

        sync.remove_from_cart(&ProductId::new("mint"));
        sync.decrease_quantity(&ProductId::new("mint"));
        sync.increase_quantity(&ProductId::new("mint"));

        assert_eq!(sync.cart(), before);
        assert_eq!(local.writes(), writes);
    }

    #[tokio::test]
    async fn test_watchers_see_optimistic_update() {
        let (sync, _, _) = engine();
        let mut updates = sync.subscribe();

        sync.add_to_cart(&product("rose", 599));

        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().count(), 1);
    }

    #[tokio::test]
    async fn test_signed_in_mutations_write_remote_only() {
        let (sync, local, remote) = engine();
        let user = AuthenticatedUser::new("u1");
        sync.set_identity(Identity::Authenticated(user.clone()))
            .await;
        let local_reads = local.reads();
        let local_writes = local.writes();

        sync.add_to_cart(&product("rose", 599));
        sync.decrease_quantity(&ProductId::new("rose"));
        sync.add_to_cart(&product("mint", 499));
        sync.flush().await;

        assert_eq!(local.reads(), local_reads);
        assert_eq!(local.writes(), local_writes);
        assert_eq!(remote.writes(), 3);
        let stored = remote.snapshot(&user.uid).cart_or_empty();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.items()[0].id, ProductId::new("mint"));

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_mutation_right_after_sign_in_keeps_account_cart() {
        let (sync, _, remote) = engine();
        let user = AuthenticatedUser::new("u1");
        let account = cart_of(&[product("rose", 599)]);
        remote.put(&user.uid, UserDocument::default().with_cart(account.clone()));

        sync.set_identity(Identity::Authenticated(user.clone()))
            .await;
        assert_eq!(sync.cart(), account);

        sync.add_to_cart(&product("mint", 499));
        sync.flush().await;

        let stored = remote.snapshot(&user.uid).cart_or_empty();
        assert_eq!(quantity(&stored, "rose"), 1);
        assert_eq!(quantity(&stored, "mint"), 1);
        assert_eq!(remote.writes(), 1);

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_changes_during_sign_in_are_replayed_onto_account_cart() {
        let remote = MemoryDocumentStore::new();
        let user = AuthenticatedUser::new("u1");
        remote.put(
            &user.uid,
            UserDocument::default().with_cart(cart_of(&[product("rose", 599)])),
        );
        let gated = Arc::new(GatedStore {
            inner: remote.clone(),
            gate: Semaphore::new(0),
        });
        let local = Arc::new(MemoryLocalStore::new());
        let sync = CartSync::new(local.clone(), gated.clone());

        let signing_in = tokio::spawn({
            let sync = sync.clone();
            let user = user.clone();
            async move { sync.set_identity(Identity::Authenticated(user)).await }
        });
        while !matches!(*sync.lock_mode(), Mode::SigningIn(_)) {
            tokio::task::yield_now().await;
        }

        sync.add_to_cart(&product("mint", 499));
        sync.add_to_cart(&product("mint", 499));
        assert_eq!(remote.writes(), 0);
        assert_eq!(local.writes(), 0);

        gated.gate.add_permits(1);
        signing_in.await.unwrap();
        sync.flush().await;

        let stored = remote.snapshot(&user.uid).cart_or_empty();
        assert_eq!(remote.writes(), 1);
        assert_eq!(quantity(&stored, "rose"), 1);
        assert_eq!(quantity(&stored, "mint"), 2);
        assert_eq!(stored.items()[0].id, ProductId::new("rose"));

        let mut updates = sync.subscribe();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            updates.wait_for(|cart| *cart == stored),
        )
        .await
        .unwrap()
        .unwrap();

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_switching_users_never_writes_previous_cart() {
        let (sync, _, remote) = engine();
        let first = AuthenticatedUser::new("u1");
        let second = AuthenticatedUser::new("u2");
        remote.put(
            &first.uid,
            UserDocument::default().with_cart(cart_of(&[product("rose", 599)])),
        );
        remote.put(
            &second.uid,
            UserDocument::default().with_cart(cart_of(&[product("mint", 499)])),
        );
        sync.set_identity(Identity::Authenticated(first.clone()))
            .await;

        sync.set_identity(Identity::Authenticated(second.clone()))
            .await;
        assert_eq!(sync.cart(), cart_of(&[product("mint", 499)]));

        sync.increase_quantity(&ProductId::new("mint"));
        sync.flush().await;

        let stored = remote.snapshot(&second.uid).cart_or_empty();
        assert_eq!(quantity(&stored, "mint"), 2);
        assert_eq!(quantity(&stored, "rose"), 0);
        assert_eq!(
            remote.snapshot(&first.uid).cart_or_empty(),
            cart_of(&[product("rose", 599)])
        );

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_clear_cart_always_persists() {
        let (sync, local, _) = engine();
        sync.clear_cart();
        assert_eq!(local.writes(), 1);
        assert_eq!(local.peek(CART_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_detached_after_shutdown() {
        let (sync, local, remote) = engine();
        sync.shutdown().await;

        sync.add_to_cart(&product("rose", 599));

        assert_eq!(sync.cart_count(), 1);
        assert_eq!(local.writes(), 0);
        assert_eq!(remote.writes(), 0);
    }
}
