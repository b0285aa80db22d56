//! REST client for the e-commerce back-office API
//!
//! Wraps the orders, products, reviews and statistics endpoints behind an
//! authenticated [`ApiClient`], and resolves order lines to product details.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod api_client;
pub mod dashboard;
pub mod enrich;
pub mod error;
pub mod reviews;

pub use api_client::{ApiClient, NewProduct, ProductUpdate};
pub use dashboard::{MonthlyActivity, merge_monthly_activity};
pub use enrich::{ProductLookup, enrich_orders};
pub use error::{ClientError, ClientResult};
pub use reviews::{ReviewedProduct, join_review_products};
