//! `mkt` - command-line storefront for the marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is kept in MARKETPLACE_SESSION_FILE)
//! mkt login -e buyer@example.com
//!
//! # Browse and fill the cart
//! mkt products --category 3
//! mkt cart add 42 --quantity 2
//!
//! # Pay with VNPay using a promotion code
//! mkt checkout --payment vnpay --code SALE10
//!
//! # Shipping estimate between two provinces
//! mkt shipping quote "Hà Nội" "Thành phố Hồ Chí Minh" --weight 1.5
//! ```
//!
//! # Commands
//!
//! - `login`, `logout`, `whoami` - session
//! - `products` - catalog listing
//! - `cart` - show, add, remove, clear
//! - `checkout` - place an order and start payment
//! - `orders` - list, show, cancel
//! - `notifications` - list, read, read-all
//! - `shipping quote` - fee and delivery estimate
//! - `shipper` - pickup queue and parcel status updates

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "mkt")]
#[command(author, version, about = "Marketplace storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and save the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prefer the environment variable)
        #[arg(short, long, env = "MARKETPLACE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and delete the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List products
    Products {
        /// Category id
        #[arg(long)]
        category: Option<String>,

        /// Brand id (needs --category)
        #[arg(long, requires = "category")]
        brand: Option<String>,

        /// Search by name
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the selected cart lines
    Checkout {
        /// Address id; the default address when omitted
        #[arg(short, long)]
        address: Option<String>,

        /// `cod`, `vnpay` or `momo`
        #[arg(short, long)]
        payment: String,

        /// Promotion code
        #[arg(short, long)]
        code: Option<String>,

        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Buyer orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Buyer notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
    /// Shipping estimates
    Shipping {
        #[command(subcommand)]
        action: ShippingAction,
    },
    /// Shipper workflow
    Shipper {
        #[command(subcommand)]
        action: ShipperAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents grouped by store
    Show,
    /// Add a product variant
    Add {
        variant: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a cart line
    Remove { item: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders
    List {
        /// Filter by status, e.g. `PENDING`
        #[arg(short, long)]
        status: Option<String>,

        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Show one order
    Show { id: String },
    /// Cancel an order
    Cancel {
        id: String,
        #[arg(short, long)]
        reason: String,
    },
}

#[derive(Subcommand)]
enum NotificationAction {
    /// List notifications
    List {
        /// Only unread ones
        #[arg(short, long)]
        unread: bool,
    },
    /// Mark one notification read
    Read { id: String },
    /// Mark every notification read
    ReadAll,
}

#[derive(Subcommand)]
enum ShippingAction {
    /// Estimate fee and delivery time between two provinces
    Quote {
        from: String,
        to: String,

        /// Parcel weight in kg
        #[arg(short, long, default_value = "0.5")]
        weight: rust_decimal::Decimal,
    },
}

#[derive(Subcommand)]
enum ShipperAction {
    /// Parcels waiting for pickup
    Ready,
    /// Start picking up a parcel
    Pick { id: String },
    /// Parcel collected from the store
    Picked { id: String },
    /// Out for delivery
    Ship { id: String },
    /// Delivered to the buyer
    Deliver { id: String },
    /// Delivery attempt failed
    Fail {
        id: String,
        #[arg(short, long)]
        reason: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marketplace_storefront=info,mkt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::open().await?;
    let result = dispatch(&ctx, cli.command).await;
    // Tokens may have been refreshed even when the command failed.
    ctx.save().await?;
    result
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<(), CliError> {
    use commands::{account, orders, shipping, shop};
    use marketplace_storefront::services::shipper::ShipperStep;

    match command {
        Commands::Login { email, password } => account::login(ctx, &email, password).await,
        Commands::Logout => account::logout(ctx).await,
        Commands::Whoami => account::whoami(ctx).await,
        Commands::Products {
            category,
            brand,
            search,
            page,
        } => shop::products(ctx, category.as_deref(), brand.as_deref(), search, page).await,
        Commands::Cart { action } => match action {
            CartAction::Show => shop::show_cart(ctx).await,
            CartAction::Add { variant, quantity } => shop::add_to_cart(ctx, &variant, quantity).await,
            CartAction::Remove { item } => shop::remove_from_cart(ctx, &item).await,
            CartAction::Clear => shop::clear_cart(ctx).await,
        },
        Commands::Checkout {
            address,
            payment,
            code,
            note,
        } => {
            orders::checkout(ctx, address.as_deref(), &payment, code.as_deref(), note).await
        }
        Commands::Orders { action } => match action {
            OrderAction::List { status, page } => orders::list(ctx, status.as_deref(), page).await,
            OrderAction::Show { id } => orders::show(ctx, &id).await,
            OrderAction::Cancel { id, reason } => orders::cancel(ctx, &id, &reason).await,
        },
        Commands::Notifications { action } => match action {
            NotificationAction::List { unread } => orders::notifications(ctx, unread).await,
            NotificationAction::Read { id } => orders::mark_read(ctx, &id).await,
            NotificationAction::ReadAll => orders::mark_all_read(ctx).await,
        },
        Commands::Shipping {
            action: ShippingAction::Quote { from, to, weight },
        } => shipping::quote(ctx, &from, &to, weight).await,
        Commands::Shipper { action } => match action {
            ShipperAction::Ready => shipping::ready(ctx).await,
            ShipperAction::Pick { id } => shipping::advance(ctx, &id, ShipperStep::Picking).await,
            ShipperAction::Picked { id } => shipping::advance(ctx, &id, ShipperStep::Picked).await,
            ShipperAction::Ship { id } => shipping::advance(ctx, &id, ShipperStep::Shipping).await,
            ShipperAction::Deliver { id } => {
                shipping::advance(ctx, &id, ShipperStep::Delivered).await
            }
            ShipperAction::Fail { id, reason } => shipping::fail(ctx, &id, &reason).await,
        },
    }
}
