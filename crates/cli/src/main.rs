//! PedeAí CLI - drive every marketplace role from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse as a customer
//! pedeai --email ana@example.com stores --category Pizza
//! pedeai menu 9a1f1d4e-2a51-4c1e-8d8e-5b8f7f0c6d21
//!
//! # Work as a courier
//! pedeai courier online
//! pedeai courier available
//! pedeai courier claim 6f1c2a8e-0d4b-4a51-9b8f-3e2d1c0b9a87
//!
//! # Back office
//! pedeai staff coupon-create --code BEMVINDO10 --type percentage --value 10
//! ```
//!
//! Credentials come from `--email`/`--password` or `PEDEAI_EMAIL` /
//! `PEDEAI_PASSWORD`. Backend settings are read from the environment (see
//! `pedeai_client::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use pedeai_client::PedeaiConfig;
use pedeai_core::{CouponId, DiscountType, OrderId, OrderStatus, PaymentMethod, ProductId, Role, UserId};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Context, Credentials};

#[derive(Parser)]
#[command(name = "pedeai")]
#[command(author, version, about = "PedeAí marketplace CLI")]
struct Cli {
    #[command(flatten)]
    credentials: Credentials,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup(SignupArgs),
    /// Show the signed-in profile and its screen
    Whoami,
    /// List stores
    Stores {
        /// Category filter
        #[arg(short, long, default_value = pedeai_core::ALL_CATEGORIES)]
        category: String,
        /// Name search
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Show a store's menu
    Menu { store: UserId },
    /// List my orders (as customer or store)
    Orders,
    /// Place and manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Follow live changes
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },
    /// Courier operations
    Courier {
        #[command(subcommand)]
        action: CourierAction,
    },
    /// Read or write an order chat
    Chat {
        order: OrderId,
        /// Keep printing new messages
        #[arg(short, long)]
        follow: bool,
        #[command(subcommand)]
        action: Option<ChatAction>,
    },
    /// Manage the signed-in store's menu
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Upload a new store photo
    StoreImage { file: PathBuf },
    /// Store revenue and order board
    Dashboard,
    /// Ask the assistant for dish ideas
    Suggest { craving: String },
    /// Generate a product description
    Describe { product: String },
    /// Validate, format and optionally look up a CNPJ
    Cnpj {
        value: String,
        /// Query the company registry
        #[arg(long)]
        lookup: bool,
    },
    /// Back-office operations
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
    /// Talk to support
    Support {
        #[command(subcommand)]
        action: Option<SupportAction>,
    },
}

#[derive(Args)]
struct SignupArgs {
    /// Account role (`client`, `store`, `courier`)
    #[arg(short, long, default_value = "client")]
    role: Role,
    /// Full name (or store name)
    #[arg(short, long)]
    name: String,
    /// Store CNPJ
    #[arg(long)]
    cnpj: Option<String>,
    /// Courier driving licence
    #[arg(long)]
    cnh: Option<String>,
    /// Check the CNPJ against the company registry
    #[arg(long)]
    lookup: bool,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show one order
    Show { id: OrderId },
    /// Place an order
    Place {
        /// Store to order from
        #[arg(long)]
        store: UserId,
        /// Product to add (repeat for more units)
        #[arg(long = "item", required = true)]
        items: Vec<ProductId>,
        /// Street, number and district
        #[arg(long)]
        address: String,
        #[arg(long)]
        complement: Option<String>,
        #[arg(long, default_value = "pix")]
        payment: PaymentMethod,
        #[arg(long)]
        coupon: Option<String>,
    },
    /// Move an order to a new status (store)
    Advance { id: OrderId, status: OrderStatus },
    /// Cancel an order (store)
    Cancel { id: OrderId },
}

#[derive(Subcommand)]
enum WatchTarget {
    /// My orders, as customer or store
    Orders,
    /// Claimable deliveries
    Deliveries,
}

#[derive(Subcommand)]
enum CourierAction {
    /// Ready orders waiting for a courier
    Available,
    /// Claim a delivery
    Claim { id: OrderId },
    /// Confirm pickup at the store
    Pickup { id: OrderId },
    /// Confirm hand-over to the customer
    Deliver { id: OrderId },
    /// Show the delivery in progress
    Active,
    /// Commission earned
    Earnings,
    /// Completed deliveries
    History,
    /// Start taking deliveries
    Online,
    /// Stop taking deliveries
    Offline,
    /// Report current position
    Locate {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message
    Send { text: String },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Add a product
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value = "Geral")]
        category: String,
        #[arg(long)]
        description: Option<String>,
        /// Photo to upload
        #[arg(long)]
        image: Option<PathBuf>,
        /// Generate the description with the assistant
        #[arg(long)]
        describe: bool,
    },
    /// Edit a product
    Update {
        id: ProductId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Remove a product
    Delete { id: ProductId },
}

#[derive(Subcommand)]
enum StaffAction {
    /// All stores with approval status
    Stores,
    /// Approve a store
    Approve { store: UserId },
    /// Reject or suspend a store
    Reject { store: UserId },
    /// List coupons
    Coupons,
    /// Create a coupon
    CouponCreate {
        #[arg(long)]
        code: String,
        /// `percentage` or `fixed`
        #[arg(long = "type", default_value = "percentage")]
        discount_type: DiscountType,
        #[arg(long)]
        value: Decimal,
        /// Minimum order value
        #[arg(long, default_value = "0")]
        min: Decimal,
    },
    /// Flip a coupon on or off
    CouponToggle { id: CouponId },
    /// Delete a coupon
    CouponDelete { id: CouponId },
    /// Support conversations
    Inbox,
    /// Answer a user
    Reply { user: UserId, text: String },
}

#[derive(Subcommand)]
enum SupportAction {
    /// Send a message to support
    Send { text: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PedeaiConfig) -> Option<sentry::ClientInitGuard> {
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

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pedeai_client=info,pedeai_cli=info".into());

    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("rustls crypto provider was already installed");
    }

    let cli = Cli::parse();

    let config = match PedeaiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_json);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli, config: PedeaiConfig) -> Result<(), CliError> {
    let ctx = Context::new(config, cli.credentials)?;

    match cli.command {
        Commands::Signup(args) => {
            commands::session::signup(
                &ctx,
                args.role,
                &args.name,
                args.cnpj.as_deref(),
                args.cnh.as_deref(),
                args.lookup,
            )
            .await?;
        }
        Commands::Whoami => commands::session::whoami(&ctx).await?,
        Commands::Stores { category, search } => {
            commands::customer::stores(&ctx, &category, &search).await?;
        }
        Commands::Menu { store } => commands::customer::menu(&ctx, store).await?,
        Commands::Orders => commands::customer::orders(&ctx).await?,
        Commands::Order { action } => match action {
            OrderAction::Show { id } => commands::customer::show_order(&ctx, id).await?,
            OrderAction::Place {
                store,
                items,
                address,
                complement,
                payment,
                coupon,
            } => {
                commands::customer::place_order(
                    &ctx,
                    store,
                    &items,
                    &address,
                    complement.as_deref(),
                    payment,
                    coupon.as_deref(),
                )
                .await?;
            }
            OrderAction::Advance { id, status } => {
                commands::store::advance(&ctx, id, status).await?;
            }
            OrderAction::Cancel { id } => {
                commands::store::advance(&ctx, id, OrderStatus::Cancelled).await?;
            }
        },
        Commands::Watch { target } => match target {
            WatchTarget::Orders => commands::customer::watch_orders(&ctx).await?,
            WatchTarget::Deliveries => commands::courier::watch_available(&ctx).await?,
        },
        Commands::Courier { action } => match action {
            CourierAction::Available => commands::courier::available(&ctx).await?,
            CourierAction::Claim { id } => commands::courier::claim(&ctx, id).await?,
            CourierAction::Pickup { id } => commands::courier::pickup(&ctx, id).await?,
            CourierAction::Deliver { id } => commands::courier::deliver(&ctx, id).await?,
            CourierAction::Active => commands::courier::active(&ctx).await?,
            CourierAction::Earnings => commands::courier::earnings(&ctx).await?,
            CourierAction::History => commands::courier::history(&ctx).await?,
            CourierAction::Online => commands::courier::set_online(&ctx, true).await?,
            CourierAction::Offline => commands::courier::set_online(&ctx, false).await?,
            CourierAction::Locate {
                latitude,
                longitude,
            } => commands::courier::locate(&ctx, latitude, longitude).await?,
        },
        Commands::Chat {
            order,
            follow,
            action,
        } => match action {
            Some(ChatAction::Send { text }) => commands::chat::send(&ctx, order, &text).await?,
            None => commands::chat::show(&ctx, order, follow).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::Add {
                name,
                price,
                category,
                description,
                image,
                describe,
            } => {
                commands::store::add_product(
                    &ctx,
                    commands::store::ProductForm {
                        name,
                        price,
                        category,
                        description,
                        image,
                        describe,
                    },
                )
                .await?;
            }
            ProductAction::Update {
                id,
                name,
                price,
                category,
                description,
                image,
            } => {
                commands::store::update_product(
                    &ctx,
                    id,
                    commands::store::ProductEdit {
                        name,
                        price,
                        category,
                        description,
                        image,
                    },
                )
                .await?;
            }
            ProductAction::Delete { id } => commands::store::delete_product(&ctx, id).await?,
        },
        Commands::StoreImage { file } => commands::store::store_image(&ctx, &file).await?,
        Commands::Dashboard => commands::store::dashboard(&ctx).await?,
        Commands::Suggest { craving } => commands::assistant::suggest(&ctx, &craving).await?,
        Commands::Describe { product } => commands::assistant::describe(&ctx, &product).await?,
        Commands::Cnpj { value, lookup } => commands::assistant::cnpj(&ctx, &value, lookup).await?,
        Commands::Staff { action } => match action {
            StaffAction::Stores => commands::staff::stores(&ctx).await?,
            StaffAction::Approve { store } => commands::staff::approve(&ctx, store, true).await?,
            StaffAction::Reject { store } => commands::staff::approve(&ctx, store, false).await?,
            StaffAction::Coupons => commands::staff::coupons(&ctx).await?,
            StaffAction::CouponCreate {
                code,
                discount_type,
                value,
                min,
            } => commands::staff::create_coupon(&ctx, &code, discount_type, value, min).await?,
            StaffAction::CouponToggle { id } => commands::staff::toggle_coupon(&ctx, id).await?,
            StaffAction::CouponDelete { id } => commands::staff::delete_coupon(&ctx, id).await?,
            StaffAction::Inbox => commands::staff::inbox(&ctx).await?,
            StaffAction::Reply { user, text } => commands::staff::reply(&ctx, user, &text).await?,
        },
        Commands::Support { action } => match action {
            Some(SupportAction::Send { text }) => commands::support::send(&ctx, &text).await?,
            None => commands::support::show(&ctx).await?,
        },
    }
    Ok(())
}
