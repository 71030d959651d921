use thiserror::Error;

/// Order validation failures, raised before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Unknown status: '{0}'")]
    UnknownStatus(String),

    #[error("An order must keep at least one item")]
    LastItem,

    #[error("An order needs at least one item")]
    EmptyItems,

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Quantity must be a positive whole number, got {0}")]
    InvalidQuantity(i64),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Order totals do not match its items: {0}")]
    TotalsMismatch(String),
}

pub type OrderResult<T> = Result<T, OrderError>;
