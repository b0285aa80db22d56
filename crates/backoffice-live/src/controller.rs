//! Paginated order list kept in step with the notification store

use crate::notifications::NotificationStore;
use backoffice_core::{Order, OrderStatus, PushKind, PushMessage};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Display state of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// The order is in the unseen set
    Unseen,
    /// The order has been acknowledged, or was never new
    Viewed,
}

/// Ordered list of orders backing the orders page
///
/// Initially sorted newest first; pushed orders are prepended as they
/// arrive. Row state comes from the shared [`NotificationStore`].
#[derive(Debug)]
pub struct OrderListController {
    orders: Vec<Order>,
    store: NotificationStore,
    loaded: bool,
    early_pushes: Vec<Order>,
}

impl OrderListController {
    /// Create an empty, not yet loaded list
    #[must_use]
    pub const fn new(store: NotificationStore) -> Self {
        Self {
            orders: Vec::new(),
            store,
            loaded: false,
            early_pushes: Vec::new(),
        }
    }

    /// Replace the list with a fetched snapshot
    ///
    /// The snapshot is sorted by creation time, newest first. Orders pushed
    /// before the first load are put back in front unless the snapshot
    /// already has them. Unseen ids no longer in the list are dropped.
    pub fn load_initial(&mut self, mut orders: Vec<Order>) {
        orders.sort_by_key(|order| Reverse(order.created_at));

        let known: HashSet<String> = orders.iter().map(|order| order.id.clone()).collect();
        let replayed: Vec<Order> = self
            .early_pushes
            .drain(..)
            .filter(|order| !known.contains(&order.id))
            .collect();

        let replayed_count = replayed.len();
        for order in replayed {
            orders.insert(0, order);
        }

        self.orders = orders;
        self.loaded = true;

        let current: HashSet<&str> = self.orders.iter().map(|order| order.id.as_str()).collect();
        let dropped = self.store.retain(|id| current.contains(id));

        info!(
            orders = self.orders.len(),
            replayed = replayed_count,
            stale_unseen = dropped,
            "Order list loaded"
        );
    }

    /// Apply a push message to the list only
    ///
    /// A `NEW_ORDER` order is prepended as is, without checking for an
    /// existing entry with the same id. Returns whether the list changed.
    pub fn on_push_message(&mut self, message: &PushMessage) -> bool {
        let Some(order) = message.arrived_order() else {
            if message.kind == PushKind::NewOrder {
                warn!("NEW_ORDER message without an order ignored");
            }
            return false;
        };

        if !self.loaded {
            self.early_pushes.push(order.clone());
        }

        debug!(order_id = %order.id, "Order pushed");
        self.orders.insert(0, order.clone());
        true
    }

    /// Apply a push message to the list, then to the store
    ///
    /// Store watchers are only notified once the list already holds the
    /// order.
    pub fn dispatch_push(&mut self, message: &PushMessage) -> bool {
        let changed = self.on_push_message(message);
        if changed {
            self.store.on_push_message(message);
        }
        changed
    }

    /// Orders on page `page` (counted from 1) of `page_size` rows
    ///
    /// Pages past the end, page 0 and a zero page size give an empty slice.
    #[must_use]
    pub fn current_page(&self, page: usize, page_size: usize) -> &[Order] {
        let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(page_size)) else {
            return &[];
        };
        let end = start.saturating_add(page_size).min(self.orders.len());
        self.orders.get(start..end).unwrap_or(&[])
    }

    /// Orders on a page paired with their row state
    #[must_use]
    pub fn page_rows(&self, page: usize, page_size: usize) -> Vec<(Order, RowState)> {
        self.current_page(page, page_size)
            .iter()
            .map(|order| (order.clone(), self.row_state(&order.id)))
            .collect()
    }

    /// Number of pages of `page_size` rows; 0 when empty
    #[must_use]
    pub const fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.orders.len().div_ceil(page_size)
    }

    /// Acknowledge the order shown in a row
    pub fn mark_row_viewed(&self, order_id: &str) -> bool {
        self.store.mark_viewed(order_id)
    }

    /// Remove every entry for `order_id`
    ///
    /// Call only after the server accepted the deletion. The id is also
    /// dropped from the unseen set. Returns whether anything was removed.
    pub fn remove_order(&mut self, order_id: &str) -> bool {
        let before = self.orders.len();
        self.orders.retain(|order| order.id != order_id);
        let removed = self.orders.len() != before;

        if removed {
            self.store.mark_viewed(order_id);
            debug!(order_id, "Order removed from list");
        }
        removed
    }

    /// Set the status of every entry for `order_id`
    ///
    /// Call only after the server accepted the change. Returns whether any
    /// entry matched.
    pub fn update_order_status(&mut self, order_id: &str, status: OrderStatus) -> bool {
        let mut matched = false;
        for order in self.orders.iter_mut().filter(|order| order.id == order_id) {
            order.status = status;
            matched = true;
        }
        if matched {
            debug!(order_id, %status, "Order status updated");
        }
        matched
    }

    /// Row state of `order_id`
    #[must_use]
    pub fn row_state(&self, order_id: &str) -> RowState {
        if self.store.is_unseen(order_id) {
            RowState::Unseen
        } else {
            RowState::Viewed
        }
    }

    /// Whole list, newest first
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Number of orders in the list
    #[must_use]
    pub const fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Whether a snapshot has been loaded
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Store backing the row states
    #[must_use]
    pub const fn store(&self) -> &NotificationStore {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
    }

    fn order(id: &str, month: u32, day: u32) -> Order {
        Order::new(id, at(month, day))
    }

    fn ids(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|order| order.id.as_str()).collect()
    }

    fn loaded(count: usize) -> OrderListController {
        let mut controller = OrderListController::new(NotificationStore::new());
        let orders = (0..count)
            .map(|i| {
                let day = u32::try_from(i % 28).unwrap() + 1;
                let month = u32::try_from(i / 28).unwrap() + 1;
                order(&format!("o{i}"), month, day)
            })
            .collect();
        controller.load_initial(orders);
        controller
    }

    #[test]
    fn test_load_initial_sorts_newest_first() {
        let mut controller = OrderListController::new(NotificationStore::new());

        controller.load_initial(vec![order("jan", 1, 1), order("mar", 3, 1), order("feb", 2, 1)]);

        assert_eq!(ids(controller.orders()), vec!["mar", "feb", "jan"]);
        assert!(controller.is_loaded());
    }

    #[test]
    fn test_load_initial_replaces_list() {
        let mut controller = loaded(5);

        controller.load_initial(vec![order("only", 1, 1)]);

        assert_eq!(ids(controller.orders()), vec!["only"]);
    }

    #[rstest]
    #[case(25, 10, 3)]
    #[case(20, 10, 2)]
    #[case(1, 10, 1)]
    #[case(0, 10, 0)]
    #[case(7, 0, 0)]
    fn test_page_count(#[case] orders: usize, #[case] page_size: usize, #[case] pages: usize) {
        assert_eq!(loaded(orders).page_count(page_size), pages);
    }

    #[test]
    fn test_last_page_holds_remainder() {
        let controller = loaded(25);

        let page = controller.current_page(3, 10);

        assert_eq!(page.len(), 5);
        assert_eq!(page, &controller.orders()[20..25]);
    }

    #[test]
    fn test_out_of_range_pages_are_empty() {
        let controller = loaded(25);

        assert!(controller.current_page(4, 10).is_empty());
        assert!(controller.current_page(0, 10).is_empty());
        assert!(controller.current_page(1, 0).is_empty());
        assert!(controller.current_page(usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn test_new_order_push_prepends_and_marks_unseen() {
        let mut controller = loaded(3);
        let before = controller.store().unseen_count();

        assert!(controller.dispatch_push(&PushMessage::new_order(order("o9", 1, 1))));

        assert_eq!(controller.orders()[0].id, "o9");
        assert_eq!(controller.store().unseen_ids(), vec!["o9".to_string()]);
        assert_eq!(controller.store().unseen_count(), before + 1);
        assert_eq!(controller.row_state("o9"), RowState::Unseen);
        assert_eq!(controller.row_state("o0"), RowState::Viewed);

        let states: Vec<_> = controller.page_rows(1, 2).into_iter().map(|(_, s)| s).collect();
        assert_eq!(states, vec![RowState::Unseen, RowState::Viewed]);
    }

    #[test]
    fn test_push_is_not_deduplicated() {
        let mut controller = loaded(1);

        controller.dispatch_push(&PushMessage::new_order(order("o0", 1, 1)));

        assert_eq!(ids(controller.orders()), vec!["o0", "o0"]);
        assert_eq!(controller.store().unseen_count(), 1);
    }

    #[test]
    fn test_unrecognized_push_changes_nothing() {
        let mut controller = loaded(3);
        let before = controller.orders().to_vec();

        assert!(!controller.dispatch_push(&PushMessage::other("ORDER_SHIPPED")));
        assert!(!controller.dispatch_push(&PushMessage::other("NEW_ORDER")));

        assert_eq!(controller.orders(), before.as_slice());
        assert_eq!(controller.store().unseen_count(), 0);
    }

    #[test]
    fn test_mark_row_viewed_transitions_row() {
        let mut controller = loaded(2);
        controller.dispatch_push(&PushMessage::new_order(order("o7", 5, 1)));

        assert!(controller.mark_row_viewed("o7"));
        assert_eq!(controller.row_state("o7"), RowState::Viewed);
        assert_eq!(controller.store().unseen_count(), 0);

        assert!(!controller.mark_row_viewed("o7"));
        assert_eq!(controller.store().unseen_count(), 0);
    }

    #[test]
    fn test_remove_order() {
        let mut controller = OrderListController::new(NotificationStore::new());
        controller.load_initial(vec![order("o1", 1, 1), order("o2", 1, 2), order("o3", 1, 3)]);
        controller.dispatch_push(&PushMessage::new_order(order("o4", 1, 4)));

        assert!(controller.remove_order("o2"));
        assert_eq!(ids(controller.orders()), vec!["o4", "o3", "o1"]);

        assert!(!controller.remove_order("o2"));
        assert_eq!(controller.len(), 3);

        assert!(controller.remove_order("o4"));
        assert_eq!(controller.store().unseen_count(), 0);
    }

    #[test]
    fn test_update_order_status() {
        let mut controller = loaded(2);

        assert!(controller.update_order_status("o1", OrderStatus::Confirmed));
        assert!(!controller.update_order_status("missing", OrderStatus::Confirmed));

        let statuses: Vec<_> = controller.orders().iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Confirmed, OrderStatus::Pending]);
    }

    #[test]
    fn test_pushes_before_load_survive_snapshot() {
        let store = NotificationStore::new();
        let mut controller = OrderListController::new(store.clone());

        controller.dispatch_push(&PushMessage::new_order(order("early1", 6, 1)));
        controller.dispatch_push(&PushMessage::new_order(order("early2", 6, 2)));
        controller.dispatch_push(&PushMessage::new_order(order("o1", 6, 3)));

        controller.load_initial(vec![order("o1", 6, 3), order("o0", 1, 1)]);

        assert_eq!(ids(controller.orders()), vec!["early2", "early1", "o1", "o0"]);
        assert_eq!(store.unseen_count(), 3);
    }

    #[test]
    fn test_load_drops_unseen_ids_missing_from_snapshot() {
        let store = NotificationStore::new();
        store.increment("deleted-elsewhere");
        let mut controller = OrderListController::new(store.clone());

        controller.load_initial(vec![order("o1", 1, 1)]);

        assert_eq!(store.unseen_count(), 0);
    }
}
