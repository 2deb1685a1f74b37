//! # Multi-pool Fund Common Types
//!
//! Shared vocabulary for the vault and strategy contracts: the error
//! taxonomy both contracts return, the `#[contracttype]` values that cross the
//! contract boundary, the client interfaces each side calls, and the fixed-point
//! helpers used for exchange-rate and share-price arithmetic.
//!
//! Enabling the `testutils` feature adds mock pool and router contracts that
//! the contract crates use in their tests.

#![no_std]

pub mod error;
pub mod interface;
pub mod math;
pub mod types;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use error::Error;
pub use interface::*;
pub use types::*;
