//! Shared types for the Spotless operations console
//!
//! Entity rows, their lenient wire decoding, the order lifecycle engine and
//! the signing authority's wire types.

pub mod models;
pub mod order;
pub mod signing;
pub mod util;
pub mod wire;

// Re-exports
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};

pub use models::Table;
pub use order::{OrderError, OrderLifecycle, StatusKey};
