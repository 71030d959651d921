//! Order lifecycle engine
//!
//! - Status keys validated against the live kanban pipeline
//! - Transitions that keep `completed_at` in step with the completed status
//! - Read-time board visibility (48h after completion)
//! - Derived money: line totals, subtotal, tax, total

pub mod error;
pub mod lifecycle;
pub mod pricing;
pub mod status;

// Re-exports
pub use error::{OrderError, OrderResult};
pub use lifecycle::{DEFAULT_VISIBILITY_WINDOW_HOURS, OrderLifecycle, StatusChange};
pub use pricing::{ItemLines, MAX_QUANTITY, Totals, line_total, price_items, validate_items};
pub use status::{
    DEFAULT_COMPLETED_STATUS, DEFAULT_INITIAL_STATUS, PipelineStages, READY_STATUS, StatusKey,
};
