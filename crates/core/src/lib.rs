//! Shopfront Core - Shared types library.
//!
//! This crate provides common types used across all Shopfront components:
//! - `storefront` - Gateway client, session state, and cart reconciliation
//! - `cli` - Command-line front end for browsing, cart, and checkout
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! Every value here is validated on construction, so code holding one of
//! these types never has to re-check it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, sizes, emails,
//!   and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
