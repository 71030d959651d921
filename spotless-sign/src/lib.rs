//! Remote signing authority for silent receipt printing
//!
//! Holds the RSA private key the local print agent trusts and signs
//! challenges for signed-in console sessions.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Security audit log line
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
