//! # Keepsake server
//! This module hosts the HTTP surface of the keepsake card service. It is responsible for:
//! Accepting order-creation requests and opening orders against the payment gateway.
//! Verifying completed payments (or founder-code redemptions) and sealing the resulting card session.
//! Serving sealed sessions to card recipients through the sanitizing load proxy.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /order`: Creates a payment-gateway order for a chosen tier.
//! * `POST /verify`: Verifies a payment signature (or redeems a founder token) and seals the card.
//! * `POST /session`: Loads a sealed session by its share key.

pub mod cli;
pub mod config;
pub mod errors;

pub mod data_objects;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
