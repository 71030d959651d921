//! Data models
//!
//! Row shapes of the gateway tables. Field names match the table columns
//! (snake_case); lenient decoding lives in [`crate::wire`].

pub mod customer;
pub mod kanban_column;
pub mod order;
pub mod profile;
pub mod service_category;
pub mod settings;
pub mod store;
pub mod table;
pub mod time_log;

// Re-exports
pub use customer::*;
pub use kanban_column::*;
pub use order::*;
pub use profile::*;
pub use service_category::*;
pub use settings::*;
pub use store::*;
pub use table::*;
pub use time_log::*;
