//! In-process gateway: tables of JSON rows behind a lock
//!
//! Behaves like the hosted dialect where the store can tell the difference
//! (ids are assigned on insert, updates merge, missing ids are a silent
//! no-op) and lets tests inject failures and latency.

use super::{ChangeEvent, ChangeFeed, ChangeKind, Gateway, SelectQuery};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use shared::Table;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Gateway call kinds, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Value>>,
    failures: HashMap<GatewayOp, VecDeque<String>>,
    selects: HashMap<Table, usize>,
    offline: bool,
}

pub struct MemoryGateway {
    inner: Mutex<Inner>,
    latency: Mutex<Duration>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Mutex::new(Inner::default()),
            latency: Mutex::new(Duration::ZERO),
            changes,
        }
    }

    /// Replace the rows of `table` without announcing a change
    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.inner.lock().tables.insert(table, rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.inner
            .lock()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of selects served for `table`
    pub fn select_count(&self, table: Table) -> usize {
        self.inner.lock().selects.get(&table).copied().unwrap_or(0)
    }

    /// The next `op` fails with a 503 carrying `message`
    pub fn fail_next(&self, op: GatewayOp, message: impl Into<String>) {
        self.inner
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    /// Every call fails while offline
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Delay applied before each call completes
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Announce a change as another client would
    pub fn emit(&self, event: ChangeEvent) {
        // 没有订阅者时发送失败, 可以忽略
        let _ = self.changes.send(event);
    }

    async fn enter(&self, op: GatewayOp) -> ClientResult<()> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.inner.lock();
        if inner.offline {
            return Err(ClientError::Gateway {
                status: 503,
                message: "Gateway unreachable".into(),
            });
        }
        if let Some(message) = inner.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(ClientError::Gateway {
                status: 503,
                message,
            });
        }
        Ok(())
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn with_id(row: Value) -> ClientResult<Map<String, Value>> {
    let Value::Object(mut object) = row else {
        return Err(ClientError::Rejected("Row must be a JSON object".into()));
    };
    let has_id = object
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_id {
        object.insert("id".into(), Value::String(shared::util::new_id()));
    }
    Ok(object)
}

fn merge(target: &mut Value, patch: Map<String, Value>) {
    if let Value::Object(existing) = target {
        for (key, value) in patch {
            existing.insert(key, value);
        }
    }
}

/// Column order used by selects: timestamps, then numbers, then text
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn as_time(v: &Value) -> Option<DateTime<Utc>> {
        v.as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(a), Some(b)) => {
            if let (Some(x), Some(y)) = (as_time(a), as_time(b)) {
                return x.cmp(&y);
            }
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            }
            a.to_string().cmp(&b.to_string())
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, table: Table, query: &SelectQuery) -> ClientResult<Vec<Value>> {
        self.enter(GatewayOp::Select).await?;
        let mut inner = self.inner.lock();
        *inner.selects.entry(table).or_default() += 1;

        let mut rows = inner.tables.get(&table).cloned().unwrap_or_default();
        if let Some(column) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_column(a.get(column), b.get(column));
                if query.descending { ord.reverse() } else { ord }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()> {
        self.enter(GatewayOp::Insert).await?;
        let rows = rows
            .into_iter()
            .map(|row| with_id(row).map(Value::Object))
            .collect::<ClientResult<Vec<_>>>()?;

        {
            let mut inner = self.inner.lock();
            let existing = inner.tables.entry(table).or_default();
            let taken: HashSet<&str> = existing.iter().filter_map(row_id).collect();
            if let Some(dup) = rows.iter().filter_map(row_id).find(|id| taken.contains(id)) {
                return Err(ClientError::Rejected(format!(
                    "duplicate key value violates unique constraint ({table}.id = {dup})"
                )));
            }
            existing.extend(rows);
        }

        debug!(%table, "Rows inserted");
        self.emit(ChangeEvent::new(table, ChangeKind::Insert));
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> ClientResult<()> {
        self.enter(GatewayOp::Update).await?;
        let Value::Object(patch) = patch else {
            return Err(ClientError::Rejected("Patch must be a JSON object".into()));
        };

        let found = {
            let mut inner = self.inner.lock();
            match inner
                .tables
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            {
                Some(row) => {
                    merge(row, patch);
                    true
                }
                None => false,
            }
        };

        // PATCH on a missing id matches zero rows and still succeeds
        if found {
            self.emit(ChangeEvent::new(table, ChangeKind::Update));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> ClientResult<()> {
        self.enter(GatewayOp::Delete).await?;
        let removed = {
            let mut inner = self.inner.lock();
            inner.tables.get_mut(&table).is_some_and(|rows| {
                let before = rows.len();
                rows.retain(|row| row_id(row) != Some(id));
                rows.len() != before
            })
        };

        if removed {
            self.emit(ChangeEvent::new(table, ChangeKind::Delete));
        }
        Ok(())
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()> {
        self.enter(GatewayOp::Upsert).await?;
        let rows = rows
            .into_iter()
            .map(with_id)
            .collect::<ClientResult<Vec<_>>>()?;

        {
            let mut inner = self.inner.lock();
            let existing = inner.tables.entry(table).or_default();
            for row in rows {
                let id = row.get("id").and_then(Value::as_str).map(str::to_owned);
                match existing
                    .iter_mut()
                    .find(|r| id.is_some() && row_id(r) == id.as_deref())
                {
                    Some(current) => merge(current, row),
                    None => existing.push(Value::Object(row)),
                }
            }
        }

        self.emit(ChangeEvent::new(table, ChangeKind::Update));
        Ok(())
    }

    async fn subscribe(&self, tables: &[Table]) -> ClientResult<ChangeFeed> {
        let wanted: HashSet<Table> = tables.iter().copied().collect();
        let mut source = self.changes.subscribe();
        let (tx, rx) = broadcast::channel(64);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = source.recv() => match event {
                        Ok(event) if wanted.contains(&event.table) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {
                            let _ = tx.send(ChangeEvent::new(Table::Orders, ChangeKind::Resync));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(ChangeFeed::with_guard(rx, shutdown.drop_guard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_ids_and_rejects_duplicates() {
        let gateway = MemoryGateway::new();
        gateway
            .insert(Table::Stores, vec![json!({"name": "Downtown"})])
            .await
            .unwrap();

        let rows = gateway.rows(Table::Stores);
        let id = rows[0]["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let err = gateway
            .insert(Table::Stores, vec![json!({"id": id, "name": "Again"})])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        assert_eq!(gateway.rows(Table::Stores).len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_id_is_noop() {
        let gateway = MemoryGateway::new();
        gateway.seed(Table::Customers, vec![json!({"id": "c1", "first_name": "Ana", "phone": "1"})]);

        gateway
            .update(Table::Customers, "c1", json!({"phone": "2"}))
            .await
            .unwrap();
        gateway
            .update(Table::Customers, "nope", json!({"phone": "3"}))
            .await
            .unwrap();

        let rows = gateway.rows(Table::Customers);
        assert_eq!(rows, vec![json!({"id": "c1", "first_name": "Ana", "phone": "2"})]);
    }

    #[tokio::test]
    async fn test_select_orders_by_time_then_number() {
        let gateway = MemoryGateway::new();
        gateway.seed(
            Table::Orders,
            vec![
                json!({"id": "a", "created_at": "2024-05-01T10:00:00Z"}),
                json!({"id": "b", "created_at": "2024-05-03T10:00:00+00:00"}),
                json!({"id": "c", "created_at": "2024-05-02T10:00:00.5Z"}),
            ],
        );
        gateway.seed(
            Table::KanbanColumns,
            vec![json!({"id": "x", "position": 10}), json!({"id": "y", "position": 2})],
        );

        let orders = gateway
            .select(Table::Orders, &SelectQuery::for_table(Table::Orders))
            .await
            .unwrap();
        let ids: Vec<_> = orders.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let columns = gateway
            .select(Table::KanbanColumns, &SelectQuery::for_table(Table::KanbanColumns))
            .await
            .unwrap();
        assert_eq!(columns[0]["id"], "y");
        assert_eq!(gateway.select_count(Table::Orders), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(GatewayOp::Delete, "maintenance");

        let err = gateway.delete(Table::Orders, "o1").await.unwrap_err();
        assert!(matches!(err, ClientError::Gateway { status: 503, .. }));
        assert!(gateway.delete(Table::Orders, "o1").await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_merges_existing_and_appends_new() {
        let gateway = MemoryGateway::new();
        gateway.seed(Table::KanbanColumns, vec![json!({"id": "k1", "label": "In", "position": 0})]);

        gateway
            .upsert(
                Table::KanbanColumns,
                vec![json!({"id": "k1", "position": 1}), json!({"id": "k2", "position": 0})],
            )
            .await
            .unwrap();

        let rows = gateway.rows(Table::KanbanColumns);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], json!({"id": "k1", "label": "In", "position": 1}));
    }

    #[tokio::test]
    async fn test_feed_only_carries_subscribed_tables() {
        let gateway = MemoryGateway::new();
        let mut feed = gateway.subscribe(&[Table::TimeLogs]).await.unwrap();

        gateway.emit(ChangeEvent::new(Table::Orders, ChangeKind::Insert));
        gateway.emit(ChangeEvent::new(Table::TimeLogs, ChangeKind::Update));

        let event = feed.recv().await.unwrap();
        assert_eq!(event, ChangeEvent::new(Table::TimeLogs, ChangeKind::Update));
    }
}
