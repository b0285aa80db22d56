//! Live order notifications for the e-commerce back office
//!
//! [`NotificationStore`] tracks which orders are new since the operator last
//! looked, fed by the WebSocket [`PushChannel`]. [`OrderListController`]
//! keeps the paginated order list, and [`OrdersView`] ties both to the REST
//! API for as long as the orders page is mounted.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod console;
pub mod controller;
pub mod error;
pub mod notifications;
pub mod push;
pub mod render;
pub mod view;

// Re-export commonly used types
pub use console::{WatchCommand, WatchSession};
pub use controller::{OrderListController, RowState};
pub use error::{LiveError, Result};
pub use notifications::{NotificationStore, StoreSubscription, UnseenSnapshot};
pub use push::{PushChannel, PushSubscription, ReconnectPolicy};
pub use view::{LoadState, OrdersBackend, OrdersView, PageView};
