//! Spotless console client
//!
//! - [`gateway`]: hosted database access (REST + realtime) and an in-memory gateway
//! - [`store`]: the synchronized store every screen reads from
//! - [`desk`]: order intake and receipt printing
//! - [`views`]: kanban board grouping and filters
//! - [`reports`]: dashboard, analytics and attendance figures
//! - [`config`]: local configuration files
//!
//! # Example
//!
//! ```ignore
//! use spotless_client::{ClientConfig, HttpGateway, OrderStore};
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(HttpGateway::new(&ClientConfig::new(url, key))?);
//! let store = Arc::new(OrderStore::new(gateway));
//! store.fetch_all().await?;
//! let _live = store.subscribe().await?;
//! ```

pub mod config;
pub mod desk;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod reports;
pub mod store;
pub mod views;

pub use config::{ClientConfig, LocalConfig, LocalConfigStorage, SettingsStore};
pub use desk::{CustomerChoice, NewCustomer, NewOrder, OrderDesk, OrderEdit};
pub use error::{ClientError, ClientResult};
pub use gateway::{
    ChangeEvent, ChangeFeed, ChangeKind, Gateway, GatewayOp, HttpGateway, MemoryGateway,
    RealtimeWorker, SelectQuery, SessionToken,
};
pub use store::{MutationOp, OrderStore, StoreSnapshot, SubscriptionHandle};
pub use views::{BoardColumn, BoardFilter, BoardView, LocationFilter};
