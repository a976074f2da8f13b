//! # Siphon Testkit
//!
//! Shared fixtures and property-test generators for the siphon crates.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;
mod generators;

pub use fixtures::{orders_rows, seeded_database, users_rows};
pub use generators::{row_strategy, rows_strategy, value_strategy};
