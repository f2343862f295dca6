//! Core types for Pharmacart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod auth;
pub mod cart;
pub mod id;
pub mod mobile;
pub mod price;

pub use auth::{AccessToken, AuthState};
pub use cart::{Cart, CartLine, ProductSnapshot};
pub use id::*;
pub use mobile::{MobileNumber, MobileNumberError};
pub use price::{CurrencyCode, Price};
