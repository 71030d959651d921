//! Remote Data Gateway
//!
//! The hosted database exposes row-level CRUD per table plus a change feed.
//! [`Gateway`] is the seam the store talks through; [`HttpGateway`] speaks
//! the hosted dialect, [`MemoryGateway`] keeps rows in process.

mod http;
mod memory;
mod realtime;

pub use http::HttpGateway;
pub use memory::{GatewayOp, MemoryGateway};
pub use realtime::RealtimeWorker;

use crate::error::ClientResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::Table;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::DropGuard;
use tracing::warn;

/// Session token shared by REST calls and the change feed; refreshed in place
pub type SessionToken = Arc<RwLock<Option<String>>>;

/// Ordering applied by a select
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub order_by: Option<String>,
    pub descending: bool,
}

impl SelectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ordered(column: impl Into<String>, descending: bool) -> Self {
        Self {
            order_by: Some(column.into()),
            descending,
        }
    }

    /// The listing order the console uses for `table`
    pub fn for_table(table: Table) -> Self {
        match table.default_order() {
            Some((column, descending)) => Self::ordered(column, descending),
            None => Self::all(),
        }
    }
}

/// Kind of row change announced by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Events were missed; everything must be reloaded
    Resync,
}

/// A notification that `table` changed (no row payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        Self { table, kind }
    }
}

/// Receiving end of a change subscription
///
/// Dropping the feed stops whatever task produces it.
pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeEvent>,
    _guard: Option<DropGuard>,
}

impl ChangeFeed {
    pub fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { rx, _guard: None }
    }

    /// Feed whose producer is cancelled when the feed is dropped
    pub fn with_guard(rx: broadcast::Receiver<ChangeEvent>, guard: DropGuard) -> Self {
        Self {
            rx,
            _guard: Some(guard),
        }
    }

    /// Next change; `None` once the producer is gone
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Change feed lagged, requesting full resync");
                Some(ChangeEvent::new(Table::Orders, ChangeKind::Resync))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

/// Row-level access to the hosted tables
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All rows of `table`
    async fn select(&self, table: Table, query: &SelectQuery) -> ClientResult<Vec<Value>>;

    async fn insert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()>;

    /// Patch the row with `id` (only the keys present in `patch`)
    async fn update(&self, table: Table, id: &str, patch: Value) -> ClientResult<()>;

    async fn delete(&self, table: Table, id: &str) -> ClientResult<()>;

    /// Insert or merge by primary key
    async fn upsert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()>;

    /// Change notifications for `tables`
    async fn subscribe(&self, tables: &[Table]) -> ClientResult<ChangeFeed>;
}
