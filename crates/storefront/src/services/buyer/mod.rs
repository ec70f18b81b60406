//! Endpoints under `/api/v1/buyer`. All of them need a signed-in buyer.

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod promotions;
pub mod returns;
pub mod reviews;
pub mod wallet;
