//! Pharmacart Core - Shared types library.
//!
//! This crate provides the domain types used across all Pharmacart components:
//! - `storefront` - Cart synchronization, remote/local collaborators, checkout
//! - `cli` - Command-line driver over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart arithmetic - no I/O, no
//! HTTP clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, mobile numbers, auth state, cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
