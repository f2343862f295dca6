//! Pharmacart CLI - drive the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Guest cart, stored in PHARMACART_CART_PATH
//! pharmacart add p1 --name "Cetirizine 10mg" --price 18.50 --quantity 2
//! pharmacart inc p1
//! pharmacart show
//!
//! # Signing in merges the guest cart into the account cart
//! pharmacart --token "$TOKEN" show
//!
//! # Send the order to the shop
//! pharmacart --token "$TOKEN" checkout --username Asha --mobile 9876543210 --address "12 MG Road"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use pharmacart_storefront::StorefrontConfig;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pharmacart")]
#[command(author, version, about = "Pharmacart cart tools")]
struct Cli {
    /// Bearer token of a signed-in customer (falls back to PHARMACART_ACCESS_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        id: String,

        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price in rupees
        #[arg(short, long)]
        price: Decimal,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Product image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product
    Remove {
        /// Product ID
        id: String,
    },
    /// Set the quantity of a product (0 or less removes it)
    Update {
        /// Product ID
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Add one unit
    Inc {
        /// Product ID
        id: String,
    },
    /// Remove one unit, keeping at least one
    Dec {
        /// Product ID
        id: String,
    },
    /// Empty the cart
    Clear,
    /// Build the WhatsApp order request
    Checkout {
        /// Customer name
        #[arg(short, long)]
        username: String,

        /// Customer mobile number
        #[arg(short, long)]
        mobile: String,

        /// Delivery address
        #[arg(short, long)]
        address: String,

        /// Customer email
        #[arg(short, long)]
        email: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
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
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pharmacart_storefront=info,pharmacart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), commands::CommandError> {
    let session = commands::Session::start(&config, cli.token).await?;

    match cli.command {
        Commands::Show => {}
        Commands::Add {
            id,
            name,
            price,
            quantity,
            image,
        } => commands::cart::add(&session, id, name, price, quantity, image).await?,
        Commands::Remove { id } => commands::cart::remove(&session, &id).await?,
        Commands::Update { id, quantity } => {
            commands::cart::update(&session, &id, quantity).await?;
        }
        Commands::Inc { id } => commands::cart::increment(&session, &id).await?,
        Commands::Dec { id } => commands::cart::decrement(&session, &id).await?,
        Commands::Clear => commands::cart::clear(&session).await?,
        Commands::Checkout {
            username,
            mobile,
            address,
            email,
        } => {
            let profile = pharmacart_storefront::checkout::CustomerProfile {
                username,
                mobile,
                address,
                email,
            };
            commands::checkout::run(&session, &config, &profile)?;
            return Ok(());
        }
    }

    commands::cart::print(&session);
    Ok(())
}
