//! Shopfront CLI - a command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! sf products list --category Men --max-price 50
//! sf products show 65f1c0ffee
//!
//! # Build a cart as a guest, then log in to merge it into the account cart
//! sf cart add 65f1c0ffee M --quantity 2
//! sf auth login ada@example.com
//!
//! # Place the order
//! sf checkout
//! sf orders list
//! ```
//!
//! # Commands
//!
//! - `products` - List, show, and seed products
//! - `cart` - Show and change the cart
//! - `auth` - Register, log in, log out
//! - `checkout` - Place an order from the cart
//! - `orders` - Order history
//!
//! State (bearer token and guest cart) persists under `SHOPFRONT_DATA_DIR`
//! between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stderr)]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront_core::{OrderId, Price, ProductId, Quantity, Size};
use shopfront_storefront::{Storefront, StorefrontConfig, StorefrontError};

mod commands;

#[derive(Parser)]
#[command(name = "sf")]
#[command(author, version, about = "Shopfront command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Place an order from the cart
    Checkout,
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Category filter
        #[arg(short, long)]
        category: Option<String>,

        /// Only products offered in this size
        #[arg(long)]
        size: Option<Size>,

        /// Minimum price
        #[arg(long, value_parser = parse_price)]
        min_price: Option<Price>,

        /// Maximum price
        #[arg(long, value_parser = parse_price)]
        max_price: Option<Price>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Products per page
        #[arg(short, long, default_value_t = 12)]
        limit: u32,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
    /// Load the gateway's sample catalog
    Seed,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product in a size
    Add {
        /// Product ID
        product_id: ProductId,

        /// Size label
        size: Size,

        /// Quantity to add
        #[arg(short, long, default_value = "1", value_parser = parse_quantity)]
        quantity: Quantity,
    },
    /// Set the quantity of a line
    Update {
        /// Product ID
        product_id: ProductId,

        /// Size label
        size: Size,

        /// New quantity (at least 1)
        #[arg(value_parser = parse_quantity)]
        quantity: Quantity,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: ProductId,

        /// Size label
        size: Size,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account and log in
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        email: String,

        /// Password (prompted for, with confirmation, when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in
    Login {
        /// Email address
        email: String,

        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out
    Logout,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders
    List,
    /// Show one order
    Show {
        /// Order ID
        id: OrderId,
    },
}

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Storefront(e) => e.user_message(),
            Self::Io(_) => self.to_string(),
        }
    }
}

fn parse_quantity(s: &str) -> Result<Quantity, String> {
    let n: i64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    Quantity::new(n).map_err(|e| e.to_string())
}

fn parse_price(s: &str) -> Result<Price, String> {
    let amount: rust_decimal::Decimal = s.trim().parse().map_err(|e| format!("{e}"))?;
    Price::new(amount).map_err(|e| e.to_string())
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean on stdout
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        let e = match e {
            CliError::Storefront(inner) => CliError::Storefront(inner.capture()),
            other => other,
        };
        tracing::error!("Command failed: {e}");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let mut storefront = Storefront::from_config(config)?;
    storefront.initialize().await?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List {
                search,
                category,
                size,
                min_price,
                max_price,
                page,
                limit,
            } => {
                let query = shopfront_storefront::models::ProductQuery {
                    search,
                    category,
                    size,
                    min_price,
                    max_price,
                    page,
                    limit,
                };
                commands::products::list(&storefront, &query).await?;
            }
            ProductsAction::Show { id } => commands::products::show(&storefront, &id).await?,
            ProductsAction::Seed => commands::products::seed(&storefront).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add {
                product_id,
                size,
                quantity,
            } => commands::cart::add(&mut storefront, &product_id, size, quantity).await?,
            CartAction::Update {
                product_id,
                size,
                quantity,
            } => commands::cart::update(&mut storefront, &product_id, &size, quantity).await?,
            CartAction::Remove { product_id, size } => {
                commands::cart::remove(&mut storefront, &product_id, &size).await?;
            }
            CartAction::Clear => commands::cart::clear(&mut storefront).await?,
        },
        Commands::Auth { action } => match action {
            AuthAction::Register {
                name,
                email,
                password,
            } => commands::auth::register(&mut storefront, name, email, password).await?,
            AuthAction::Login { email, password } => {
                commands::auth::login(&mut storefront, email, password).await?;
            }
            AuthAction::Logout => commands::auth::logout(&mut storefront).await?,
            AuthAction::Whoami => commands::auth::whoami(&storefront),
        },
        Commands::Checkout => commands::orders::checkout(&mut storefront).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&storefront).await?,
            OrdersAction::Show { id } => commands::orders::show(&storefront, &id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_quantity_enforces_floor() {
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-3").is_err());
        assert_eq!(parse_quantity(" 2 ").map(Quantity::get), Ok(2));
    }

    #[test]
    fn test_parse_cart_add() {
        let cli = Cli::try_parse_from(["sf", "cart", "add", "p1", "M", "-q", "3"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Cart {
                action: CartAction::Add { .. }
            })
        ));
    }
}
