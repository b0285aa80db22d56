//! Application-wide record of orders that have not been looked at yet
//!
//! The unseen count is never stored on its own; it is always the size of
//! the unseen set, so the two cannot drift apart.

use crate::push::{PushChannel, PushSubscription};
use backoffice_core::{OrderId, PushKind, PushMessage};
use indexmap::IndexSet;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Published view of the unseen set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnseenSnapshot {
    /// Number of unseen orders
    pub count: usize,
    /// Unseen order ids, oldest notification first
    pub ids: Vec<OrderId>,
}

impl UnseenSnapshot {
    fn of(unseen: &IndexSet<OrderId>) -> Self {
        Self {
            count: unseen.len(),
            ids: unseen.iter().cloned().collect(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    unseen: RwLock<IndexSet<OrderId>>,
    updates: watch::Sender<UnseenSnapshot>,
}

/// Shared store of unseen order ids
///
/// Cloning is cheap and every clone sees the same set. Changes are
/// published to [`NotificationStore::watch`] receivers.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    inner: Arc<Inner>,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (updates, _) = watch::channel(UnseenSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                unseen: RwLock::new(IndexSet::new()),
                updates,
            }),
        }
    }

    /// Apply a push message
    ///
    /// Only `NEW_ORDER` messages carrying an order change the set. Returns
    /// whether the set changed.
    pub fn on_push_message(&self, message: &PushMessage) -> bool {
        if let Some(order) = message.arrived_order() {
            return self.increment(&order.id);
        }

        match &message.kind {
            PushKind::NewOrder => warn!("NEW_ORDER message without an order ignored"),
            PushKind::Other(kind) => debug!(kind = %kind, "Ignoring push message"),
        }
        false
    }

    /// Record an order as unseen
    ///
    /// Returns `false` if it already was.
    pub fn increment(&self, order_id: &str) -> bool {
        let mut unseen = self.inner.unseen.write();
        let inserted = unseen.insert(order_id.to_string());
        if inserted {
            debug!(order_id, count = unseen.len(), "Order marked unseen");
            self.publish(&unseen);
        }
        inserted
    }

    /// Acknowledge an order
    ///
    /// No-op when the order is not unseen. Returns whether it was.
    pub fn mark_viewed(&self, order_id: &str) -> bool {
        let mut unseen = self.inner.unseen.write();
        let removed = unseen.shift_remove(order_id);
        if removed {
            debug!(order_id, count = unseen.len(), "Order marked viewed");
            self.publish(&unseen);
        }
        removed
    }

    /// Drop every unseen id for which `keep` returns `false`
    ///
    /// Returns how many ids were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut unseen = self.inner.unseen.write();
        let before = unseen.len();
        unseen.retain(|id| keep(id.as_str()));
        let dropped = before - unseen.len();
        if dropped > 0 {
            self.publish(&unseen);
        }
        dropped
    }

    /// Number of unseen orders
    #[must_use]
    pub fn unseen_count(&self) -> usize {
        self.inner.unseen.read().len()
    }

    /// Unseen order ids, oldest notification first
    #[must_use]
    pub fn unseen_ids(&self) -> Vec<OrderId> {
        self.inner.unseen.read().iter().cloned().collect()
    }

    /// Whether `order_id` is unseen
    #[must_use]
    pub fn is_unseen(&self, order_id: &str) -> bool {
        self.inner.unseen.read().contains(order_id)
    }

    /// Current count and ids together
    #[must_use]
    pub fn snapshot(&self) -> UnseenSnapshot {
        UnseenSnapshot::of(&self.inner.unseen.read())
    }

    /// Receiver that observes every published change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<UnseenSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Connect to `channel` and feed its messages into the store
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn subscribe(&self, channel: &PushChannel) -> StoreSubscription {
        self.attach(channel.subscribe())
    }

    /// Feed an existing push subscription into the store
    #[must_use]
    pub fn attach(&self, mut subscription: PushSubscription) -> StoreSubscription {
        let store = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    message = subscription.recv() => match message {
                        Some(message) => {
                            store.on_push_message(&message);
                        }
                        None => {
                            debug!("Push channel ended, store feed stopping");
                            break;
                        }
                    },
                }
            }
            subscription.unsubscribe().await;
        });

        StoreSubscription {
            cancel,
            task: Some(task),
        }
    }

    fn publish(&self, unseen: &IndexSet<OrderId>) {
        self.inner.updates.send_replace(UnseenSnapshot::of(unseen));
    }
}

/// Handle keeping the store connected to the push channel
///
/// Dropping it releases the channel; [`StoreSubscription::unsubscribe`]
/// also waits for the release to finish.
#[derive(Debug)]
pub struct StoreSubscription {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StoreSubscription {
    /// Release the push channel and wait until it is closed
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Store feed task ended abnormally");
        }
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
