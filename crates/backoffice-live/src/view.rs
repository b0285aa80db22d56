//! Mounted orders page: initial fetch, live pushes and row commands
//!
//! Background tasks only hold a [`Weak`] reference to the view state plus a
//! cancellation token, so nothing they finish after the view is gone can
//! touch it.

use crate::controller::{OrderListController, RowState};
use crate::error::{LiveError, Result};
use crate::notifications::NotificationStore;
use crate::push::PushSubscription;
use async_trait::async_trait;
use backoffice_client::{ApiClient, ClientResult};
use backoffice_core::{Order, OrderStatus};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Server operations the orders page relies on
#[async_trait]
pub trait OrdersBackend: Send + Sync {
    /// Fetch all orders with product details resolved
    async fn fetch_orders(&self) -> ClientResult<Vec<Order>>;

    /// Mark an order as confirmed on the server
    async fn confirm_order(&self, order_id: &str) -> ClientResult<()>;

    /// Delete an order on the server
    async fn delete_order(&self, order_id: &str) -> ClientResult<()>;
}

#[async_trait]
impl OrdersBackend for ApiClient {
    async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
        self.fetch_enriched_orders().await
    }

    async fn confirm_order(&self, order_id: &str) -> ClientResult<()> {
        Self::confirm_order(self, order_id).await
    }

    async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        Self::delete_order(self, order_id).await
    }
}

/// Progress of the initial fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Fetch in flight
    Loading,
    /// Orders loaded
    Ready,
    /// Fetch failed; the message is meant for the operator
    Failed(String),
}

/// Everything needed to draw one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    /// Orders on the page with their row state
    pub rows: Vec<(Order, RowState)>,
    /// Page number, counted from 1
    pub page: usize,
    /// Total number of pages
    pub page_count: usize,
    /// Unseen orders across the whole list
    pub unseen_count: usize,
    /// Initial fetch progress
    pub load_state: LoadState,
    /// Whether live updates are still arriving
    pub live: bool,
}

#[derive(Debug)]
struct ViewState {
    controller: OrderListController,
    load_state: LoadState,
    live: bool,
    revision: watch::Sender<u64>,
}

impl ViewState {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

/// The orders page while it is on screen
///
/// Created by [`OrdersView::mount`]. Dropping it cancels the background
/// tasks; [`OrdersView::unmount`] also waits for them.
pub struct OrdersView {
    state: Arc<Mutex<ViewState>>,
    backend: Arc<dyn OrdersBackend>,
    store: NotificationStore,
    page_size: usize,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for OrdersView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrdersView")
            .field("page_size", &self.page_size)
            .field("load_state", &self.load_state())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl OrdersView {
    /// Mount the page: start the initial fetch and apply pushes as they come
    ///
    /// Pushes that arrive before the fetch completes are kept. Must be
    /// called from within a Tokio runtime.
    #[must_use]
    pub fn mount(
        backend: Arc<dyn OrdersBackend>,
        store: NotificationStore,
        push: PushSubscription,
        page_size: usize,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        let state = Arc::new(Mutex::new(ViewState {
            controller: OrderListController::new(store.clone()),
            load_state: LoadState::Loading,
            live: true,
            revision,
        }));
        let cancel = CancellationToken::new();
        let page_size = page_size.max(1);

        let tasks = vec![
            tokio::spawn(run_initial_fetch(
                Arc::clone(&backend),
                Arc::downgrade(&state),
                cancel.clone(),
            )),
            tokio::spawn(run_push_feed(push, Arc::downgrade(&state), cancel.clone())),
        ];

        info!(page_size, "Orders view mounted");

        Self {
            state,
            backend,
            store,
            page_size,
            cancel,
            tasks,
        }
    }

    /// Confirm an order on the server, then in the list
    ///
    /// # Errors
    ///
    /// Returns the API error; the list is left unchanged.
    #[instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: &str) -> Result<()> {
        if let Err(e) = self.backend.confirm_order(order_id).await {
            warn!(order_id, error = %e, "Confirming order failed");
            return Err(e.into());
        }

        let state = &mut *self.state.lock();
        state
            .controller
            .update_order_status(order_id, OrderStatus::Confirmed);
        state.bump();
        Ok(())
    }

    /// Delete an order on the server, then from the list
    ///
    /// # Errors
    ///
    /// Returns the API error; the list is left unchanged.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: &str) -> Result<()> {
        if let Err(e) = self.backend.delete_order(order_id).await {
            warn!(order_id, error = %e, "Deleting order failed");
            return Err(e.into());
        }

        let state = &mut *self.state.lock();
        state.controller.remove_order(order_id);
        state.bump();
        Ok(())
    }

    /// Acknowledge the order in a row
    pub fn mark_row_viewed(&self, order_id: &str) -> bool {
        let state = self.state.lock();
        let changed = state.controller.mark_row_viewed(order_id);
        if changed {
            state.bump();
        }
        changed
    }

    /// Snapshot of page `page`, counted from 1
    #[must_use]
    pub fn page_view(&self, page: usize) -> PageView {
        let state = self.state.lock();
        PageView {
            rows: state.controller.page_rows(page, self.page_size),
            page,
            page_count: state.controller.page_count(self.page_size),
            unseen_count: self.store.unseen_count(),
            load_state: state.load_state.clone(),
            live: state.live,
        }
    }

    /// Current fetch progress
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.state.lock().load_state.clone()
    }

    /// Wait for the initial fetch to finish
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Load`] if the fetch failed.
    pub async fn wait_until_loaded(&self) -> Result<()> {
        let mut changes = self.changes();
        loop {
            match self.load_state() {
                LoadState::Ready => return Ok(()),
                LoadState::Failed(message) => return Err(LiveError::Load { message }),
                LoadState::Loading => {}
            }
            if changes.changed().await.is_err() {
                return Err(LiveError::ChannelClosed);
            }
        }
    }

    /// Receiver that ticks whenever the page content may have changed
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.state.lock().revision.subscribe()
    }

    /// Rows per page
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Store backing the row states
    #[must_use]
    pub const fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Tear the page down and wait for its tasks to stop
    ///
    /// The push subscription is released before this returns.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "Orders view task ended abnormally");
            }
        }
        info!("Orders view unmounted");
    }
}

impl Drop for OrdersView {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_initial_fetch(
    backend: Arc<dyn OrdersBackend>,
    state: Weak<Mutex<ViewState>>,
    cancel: CancellationToken,
) {
    let mut fetch = tokio::spawn(async move { backend.fetch_orders().await });

    let joined = tokio::select! {
        () = cancel.cancelled() => {
            fetch.abort();
            debug!("Orders view unmounted before the fetch completed");
            return;
        }
        joined = &mut fetch => joined,
    };

    if cancel.is_cancelled() {
        return;
    }
    let Some(shared) = state.upgrade() else {
        debug!("Orders view gone, discarding fetched orders");
        return;
    };

    let state = &mut *shared.lock();
    match joined {
        Ok(Ok(orders)) => {
            state.controller.load_initial(orders);
            state.load_state = LoadState::Ready;
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to load orders");
            state.load_state = LoadState::Failed(LiveError::from(e).user_message());
        }
        Err(e) => {
            error!(error = %e, "Order fetch task failed");
            state.load_state = LoadState::Failed("Order fetch stopped unexpectedly".to_string());
        }
    }
    state.bump();
}

async fn run_push_feed(
    mut push: PushSubscription,
    state: Weak<Mutex<ViewState>>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => break,
            message = push.recv() => message,
        };

        let Some(shared) = state.upgrade() else {
            break;
        };

        let Some(message) = message else {
            warn!("Push channel ended, live updates stopped");
            {
                let state = &mut *shared.lock();
                state.live = false;
                state.bump();
            }
            break;
        };

        {
            let state = &mut *shared.lock();
            if state.controller.dispatch_push(&message) {
                state.bump();
            }
        }
    }

    push.unsubscribe().await;
}
