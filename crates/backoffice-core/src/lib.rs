//! Core types and utilities for the e-commerce back-office client

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use types::{
    NEW_ORDER, Order, OrderId, OrderItem, OrderStatus, Product, ProductRef, PushKind, PushMessage,
    Review, Session, UserSummary,
};

/// Initialize the logging system
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(logging: &config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };

    installed.map_err(|e| Error::configuration(format!("Failed to initialize logging: {e}")))
}
