//! Marketplace Core - domain types and storefront rules.
//!
//! This crate holds everything the storefront computes on its own, without
//! talking to the backend. Sibling crates build on it:
//! - `marketplace-storefront` - typed client for the marketplace REST API
//! - `marketplace-cli` - `mkt` command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Backend records are deserialized into these types by the
//! storefront crate, and the rules here (discounts, shipping tiers, cart
//! grouping) run locally for immediate display.
//!
//! # Modules
//!
//! - [`types`] - ids, money, contact details, statuses
//! - [`pagination`] - tolerant page decoding
//! - [`address`] - delivery addresses and their validation
//! - [`promotion`] - promotion normalisation and discount calculation
//! - [`cart`] - cart lines, selection, per-store grouping
//! - [`checkout`] - checkout quote and order request assembly
//! - [`shipping`] - fee tiers and delivery estimates
//! - [`payment`] - `VNPay` callbacks and `MoMo` payloads
//! - [`order`], [`shipment`], [`notification`], [`review`] - read models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod checkout;
pub mod notification;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod promotion;
pub mod review;
pub mod shipment;
pub mod shipping;
pub mod types;

pub use types::*;
