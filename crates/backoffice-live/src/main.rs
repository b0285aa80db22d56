//! Back-office orders console
//!
//! Watches incoming orders live and runs the order, product and review
//! administration calls from the command line.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

use backoffice_client::{ApiClient, NewProduct, ProductUpdate};
use backoffice_core::config::ApiConfig;
use backoffice_core::{Config, Session};
use backoffice_live::console::{HELP, spawn_line_reader};
use backoffice_live::render::{operator_line, render_orders_page};
use backoffice_live::{
    LiveError, LoadState, NotificationStore, OrderListController, OrdersView, PageView,
    PushChannel, Result, WatchCommand, WatchSession,
};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

/// Command line interface for the back-office orders console
#[derive(Parser)]
#[command(
    name = "backoffice-orders",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live order notifications for the e-commerce back office",
    long_about = "Watches new orders arriving over the push channel and manages orders, products and reviews through the back-office REST API."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    json: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Show the order list, update it as new orders arrive and read commands from stdin
    Watch {
        /// Page to display
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Print one page of orders
    List {
        /// Page to display
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Confirm an order
    Confirm {
        /// Order identifier
        #[arg(value_name = "ORDER_ID")]
        order_id: String,
    },

    /// Delete an order
    Delete {
        /// Order identifier
        #[arg(value_name = "ORDER_ID")]
        order_id: String,
    },

    /// List or manage catalogue products
    #[command(alias = "product")]
    Products {
        /// Action (lists products when omitted)
        #[command(subcommand)]
        action: Option<ProductAction>,
    },

    /// List or manage customer reviews
    #[command(alias = "review")]
    Reviews {
        /// Action (lists reviews when omitted)
        #[command(subcommand)]
        action: Option<ReviewAction>,
    },

    /// Show sales statistics per category
    Stats,

    /// Show orders and new products per month
    Dashboard {
        /// Year to report on (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Also list the products sold in this month (1 to 12)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },

    /// Validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },

    /// End the session on the server
    Logout,
}

/// Product actions
#[derive(Subcommand)]
enum ProductAction {
    /// List catalogue products
    List,

    /// Create a product
    Create {
        /// Product name
        #[arg(long)]
        name: String,

        /// Category label
        #[arg(long)]
        category: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Long description
        #[arg(long, default_value = "")]
        description: String,

        /// Cover image URL
        #[arg(long, default_value = "")]
        image_cover: String,
    },

    /// Change a product's name and price
    Edit {
        /// Product identifier
        #[arg(value_name = "PRODUCT_ID")]
        product_id: String,

        /// New name
        #[arg(long)]
        name: String,

        /// New price
        #[arg(long)]
        price: f64,
    },

    /// Delete a product
    Delete {
        /// Product identifier
        #[arg(value_name = "PRODUCT_ID")]
        product_id: String,
    },
}

/// Review actions
#[derive(Subcommand)]
enum ReviewAction {
    /// List reviews with the product they are about
    List,

    /// Delete a review
    Delete {
        /// Review identifier
        #[arg(value_name = "REVIEW_ID")]
        review_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.format = "json".to_string();
    }
    backoffice_core::init_logging(&config.logging)?;

    if let Err(e) = dotenv {
        debug!(error = %e, ".env file not loaded");
    }

    match cli.command {
        Commands::Config { show } => show_config(&config, show),
        Commands::Watch { page } => watch_orders(&config, page).await,
        Commands::List { page } => list_orders(&config, page).await,
        Commands::Confirm { order_id } => {
            api_client(&config)?.confirm_order(&order_id).await?;
            println!("Order {order_id} confirmed");
            Ok(())
        }
        Commands::Delete { order_id } => {
            api_client(&config)?.delete_order(&order_id).await?;
            println!("Order {order_id} deleted");
            Ok(())
        }
        Commands::Products { action } => {
            manage_products(&config, action.unwrap_or(ProductAction::List)).await
        }
        Commands::Reviews { action } => {
            manage_reviews(&config, action.unwrap_or(ReviewAction::List)).await
        }
        Commands::Stats => show_stats(&config).await,
        Commands::Dashboard { year, month } => {
            let year = year.unwrap_or_else(|| chrono::Utc::now().year());
            show_dashboard(&config, year, month).await
        }
        Commands::Logout => {
            api_client(&config)?.logout().await?;
            println!("Logged out");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn session(api: &ApiConfig) -> Result<Session> {
    let token = api.token.as_deref().ok_or_else(|| {
        backoffice_core::Error::configuration(
            "api.token is not set (use BACKOFFICE__API__TOKEN or the config file)",
        )
    })?;

    let session = Session::new(token)?;
    Ok(match &api.user {
        Some(user) => session.with_user(user.clone()),
        None => session,
    })
}

fn api_client(config: &Config) -> Result<ApiClient> {
    let session = session(&config.api)?;
    Ok(ApiClient::from_config(&config.api, session)?)
}

async fn watch_orders(config: &Config, page: usize) -> Result<()> {
    let client = api_client(config)?;
    let operator = operator_line(client.session().user());
    let store = NotificationStore::new();
    let push = PushChannel::from_config(&config.push).subscribe();

    let view = OrdersView::mount(Arc::new(client), store, push, config.orders.page_size);
    let mut changes = view.changes();
    let mut input = spawn_line_reader(BufReader::new(std::io::stdin()));
    let mut input_open = true;
    let mut session = WatchSession::new(page);
    info!(url = %config.push.url, "Watching orders, press Ctrl+C to stop");
    println!("{HELP}");

    let outcome = loop {
        let current = view.page_view(session.page);
        println!("{operator}");
        print!("{}", render_orders_page(&current));
        if let Some(status) = &session.status {
            println!("{status}");
        }
        if !current.live {
            break Err(LiveError::ChannelClosed);
        }

        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Received Ctrl+C, stopping");
                break Ok(());
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            line = input.recv(), if input_open => match line {
                Some(Ok(line)) => match line.parse::<WatchCommand>() {
                    Ok(command) => {
                        if !session.apply(&view, command).await {
                            break Ok(());
                        }
                    }
                    Err(e) => session.reject(&e),
                },
                Some(Err(e)) => break Err(e.into()),
                None => {
                    debug!("Standard input closed, watching without commands");
                    input_open = false;
                }
            },
        }
    };

    view.unmount().await;
    outcome
}

async fn list_orders(config: &Config, page: usize) -> Result<()> {
    let orders = api_client(config)?.fetch_enriched_orders().await?;

    let mut controller = OrderListController::new(NotificationStore::new());
    controller.load_initial(orders);

    let page_size = config.orders.page_size;
    let current = PageView {
        rows: controller.page_rows(page, page_size),
        page,
        page_count: controller.page_count(page_size),
        unseen_count: 0,
        load_state: LoadState::Ready,
        live: true,
    };
    print!("{}", render_orders_page(&current));
    Ok(())
}

async fn manage_products(config: &Config, action: ProductAction) -> Result<()> {
    let client = api_client(config)?;

    match action {
        ProductAction::List => {
            let products = client.list_products().await?;
            println!("{} products", products.len());
            for product in products {
                let price = format!("${:.2}", product.price);
                println!(
                    "{:<26} {:<32} {price:>10} {}",
                    product.id,
                    product.name,
                    product.categories.as_deref().unwrap_or("-"),
                );
            }
        }
        ProductAction::Create {
            name,
            category,
            price,
            description,
            image_cover,
        } => {
            let product = NewProduct {
                name,
                categories: category,
                price,
                description,
                image_cover,
            };
            let created = client.create_product(&product).await?;
            println!("Product {} created ({})", created.id, created.name);
        }
        ProductAction::Edit {
            product_id,
            name,
            price,
        } => {
            client
                .update_product(&product_id, &ProductUpdate { name, price })
                .await?;
            println!("Product {product_id} updated");
        }
        ProductAction::Delete { product_id } => {
            client.delete_product(&product_id).await?;
            println!("Product {product_id} deleted");
        }
    }
    Ok(())
}

async fn manage_reviews(config: &Config, action: ReviewAction) -> Result<()> {
    let client = api_client(config)?;

    match action {
        ReviewAction::List => {
            let reviews = client.reviews_with_products().await?;
            println!("{} reviews", reviews.len());
            for entry in &reviews {
                let review = &entry.review;
                let author = review.user.as_ref().map_or("-", |user| user.name.as_str());
                println!(
                    "{:<26} {:<26} {}/5 {:<16} {}",
                    review.id,
                    entry.product_label(),
                    review.rating,
                    author,
                    review.review,
                );
            }
        }
        ReviewAction::Delete { review_id } => {
            client.delete_review(&review_id).await?;
            println!("Review {review_id} deleted");
        }
    }
    Ok(())
}

async fn show_stats(config: &Config) -> Result<()> {
    let stats = api_client(config)?.product_stats().await?;

    println!("{:<20} {:>8} {:>12} {:>10}", "Category", "Products", "Units sold", "Avg price");
    for stat in stats {
        println!(
            "{:<20} {:>8} {:>12} {:>10.2}",
            stat.category, stat.count, stat.total_sales, stat.avg_price
        );
    }
    Ok(())
}

async fn show_dashboard(config: &Config, year: i32, month: Option<u32>) -> Result<()> {
    let series = api_client(config)?.monthly_activity(year).await?;

    println!("Activity for {year}");
    println!(
        "{:<10} {:>7} {:>13} {:>6}  {}",
        "Month", "Orders", "New products", "Sold", "Most ordered"
    );
    for entry in &series {
        println!(
            "{:<10} {:>7} {:>13} {:>6}  {}",
            entry.name,
            entry.orders,
            entry.products_created,
            entry.sold.len(),
            entry.most_ordered().unwrap_or("-"),
        );
    }

    if let Some(entry) = month.and_then(|month| series.iter().find(|entry| entry.month == month)) {
        println!();
        println!("Products sold in {}", entry.name);
        for detail in &entry.sold {
            let sold_at = detail
                .created_at
                .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
            println!(
                "{sold_at:<10} {:<32} {}",
                detail.name,
                detail.categories.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}

fn show_config(config: &Config, show: bool) -> Result<()> {
    config.validate()?;

    if show {
        let mut printable = config.clone();
        if printable.api.token.is_some() {
            printable.api.token = Some("<redacted>".to_string());
        }
        let text = toml::to_string_pretty(&printable).map_err(|e| {
            backoffice_core::Error::configuration(format!("Failed to render configuration: {e}"))
        })?;
        println!("{text}");
    }

    println!("Configuration is valid");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use backoffice_core::UserSummary;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_missing_token_is_a_configuration_error() {
        let config = Config::default();

        let err = api_client(&config).unwrap_err();

        assert!(matches!(
            err,
            LiveError::Core(backoffice_core::Error::Configuration { .. })
        ));
        assert!(err.to_string().contains("BACKOFFICE__API__TOKEN"));
    }

    #[test]
    fn test_blank_token_is_rejected() {
        let mut config = Config::default();
        config.api.token = Some("   ".to_string());

        let err = api_client(&config).unwrap_err();
        assert!(matches!(
            err,
            LiveError::Core(backoffice_core::Error::Validation { .. })
        ));
    }

    #[test]
    fn test_session_carries_configured_operator() {
        let mut config = Config::default();
        config.api.token = Some("secret".to_string());
        config.api.user = Some(UserSummary {
            name: "Amira".to_string(),
            role: Some("admin".to_string()),
            ..UserSummary::default()
        });

        let client = api_client(&config).unwrap();

        assert_eq!(client.session().token(), "secret");
        assert_eq!(
            operator_line(client.session().user()),
            "Signed in as Amira (admin)"
        );
    }

    #[test]
    fn test_product_and_review_actions_parse() {
        let cli = Cli::try_parse_from([
            "backoffice-orders",
            "product",
            "edit",
            "p1",
            "--name",
            "Fouta",
            "--price",
            "19.5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Products {
                action: Some(ProductAction::Edit { ref product_id, .. })
            } if product_id == "p1"
        ));

        let cli = Cli::try_parse_from(["backoffice-orders", "review", "delete", "r1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reviews {
                action: Some(ReviewAction::Delete { ref review_id })
            } if review_id == "r1"
        ));

        let cli = Cli::try_parse_from(["backoffice-orders", "products"]).unwrap();
        assert!(matches!(cli.command, Commands::Products { action: None }));
    }
}
