//! Marketplace storefront client library.
//!
//! A typed async client for the marketplace REST backend: session and token
//! handling, envelope unwrapping, retries, caching, and one service module per
//! backend area. [`checkout::CheckoutService`] ties the core checkout rules to
//! the backend calls.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod services;
pub mod session;

pub use client::ApiClient;
pub use config::StorefrontConfig;
pub use error::ApiError;
pub use session::{Session, SessionStore, SessionUser};
