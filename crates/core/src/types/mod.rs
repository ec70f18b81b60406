//! Core types for the marketplace storefront.
//!
//! Type-safe wrappers for ids, money, contact details, backend statuses and
//! timestamps.

pub mod contact;
pub mod id;
pub mod money;
pub mod status;
pub mod time;

pub use contact::{Email, EmailError, Phone, PhoneError};
pub use id::*;
pub use money::Vnd;
pub use status::*;
