//! Backend services, one module per API area.
//!
//! Each module adds methods to [`ApiClient`](crate::ApiClient), in the same
//! way the catalog and order endpoints are grouped on the backend:
//!
//! - `auth` - registration, login, tokens, profile
//! - `catalog` - products, variants, categories, brands, stores, public reviews
//! - `provinces` - local province/commune data and shipping quotes
//! - `buyer` - orders, addresses, cart, promotions, reviews, payments,
//!   returns, wallet
//! - `notifications` - buyer, store and admin inboxes
//! - `seller` - store orders, shipments, promotions, catalog, wallet,
//!   returns, analytics
//! - `shipper` - parcel pickup and delivery
//! - `admin` - stores, users, platform promotions, statistics, shippers,
//!   revenue, withdrawals, refunds, disputes

pub mod admin;
pub mod auth;
pub mod buyer;
pub mod catalog;
pub mod notifications;
pub mod provinces;
pub mod seller;
pub mod shipper;
