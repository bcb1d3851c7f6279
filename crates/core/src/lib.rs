//! RocketShoes Core - Shared catalog types.
//!
//! This crate provides the types exchanged between the cart store and the
//! catalog/stock service:
//! - [`ProductId`] - Type-safe product identifier
//! - [`Price`] - Decimal price with display formatting
//! - [`Product`] - Product metadata served by `GET products/{id}`
//! - [`Stock`] - Available quantity served by `GET stock/{id}`
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! persistence. The cart store and its adapters live in `rocketshoes-cart`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
