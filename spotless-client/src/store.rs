//! Synchronized Store Core
//!
//! Local mirror of the server-authoritative collections. Every mutation is
//! written through the [`Gateway`] first and then re-read, so what callers
//! observe is always a whole snapshot the server produced. Readers hold
//! `Arc<StoreSnapshot>` values and never see a half-applied refetch.
//!
//! Overlapping refetches are ordered by generation: a result is applied only
//! if no later-started refetch got there first.

use crate::error::{ClientError, ClientResult};
use crate::gateway::{ChangeKind, Gateway, SelectQuery};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::Table;
use shared::models::{
    Customer, CustomerUpdate, KanbanColumn, KanbanColumnUpdate, Order, OrderUpdate, Profile,
    ProfileUpdate, ServiceCategory, ServiceCategoryUpdate, Store, StoreUpdate, TimeLog,
    TimeLogCreate, open_log_for, reorder_columns,
};
use shared::order::{OrderLifecycle, PipelineStages, StatusKey, validate_items};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// One consistent view of every collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Newest first
    pub orders: Vec<Order>,
    pub customers: Vec<Customer>,
    pub stores: Vec<Store>,
    pub service_categories: Vec<ServiceCategory>,
    /// By position
    pub kanban_columns: Vec<KanbanColumn>,
    pub users: Vec<Profile>,
    /// Newest clock-in first
    pub time_logs: Vec<TimeLog>,
    /// A full fetch has been applied at least once
    pub loaded: bool,
}

impl StoreSnapshot {
    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn store(&self, id: &str) -> Option<&Store> {
        self.stores.iter().find(|s| s.id == id)
    }

    pub fn user(&self, id: &str) -> Option<&Profile> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn open_log(&self, user_id: &str) -> Option<&TimeLog> {
        open_log_for(&self.time_logs, user_id)
    }

    /// Statuses orders may move to; anything well-formed before the board loads
    pub fn stages(&self, lifecycle: &OrderLifecycle) -> PipelineStages {
        if self.kanban_columns.is_empty() {
            PipelineStages::unrestricted(lifecycle.completed_status())
        } else {
            lifecycle.stages(&self.kanban_columns)
        }
    }
}

/// A row-level write
#[derive(Debug, Clone)]
pub enum MutationOp {
    Insert(Vec<Value>),
    Update { id: String, patch: Value },
    Delete { id: String },
    Upsert(Vec<Value>),
}

impl MutationOp {
    pub fn insert<T: Serialize>(row: &T) -> ClientResult<Self> {
        Ok(Self::Insert(vec![serde_json::to_value(row)?]))
    }

    pub fn update<T: Serialize>(id: impl Into<String>, patch: &T) -> ClientResult<Self> {
        Ok(Self::Update {
            id: id.into(),
            patch: serde_json::to_value(patch)?,
        })
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    fn validate(&self) -> ClientResult<()> {
        let blank_id = |id: &str| id.trim().is_empty();
        match self {
            Self::Insert(rows) | Self::Upsert(rows) if rows.is_empty() => {
                Err(ClientError::validation("Nothing to write"))
            }
            Self::Insert(rows) | Self::Upsert(rows) if rows.iter().any(|r| !r.is_object()) => {
                Err(ClientError::validation("Rows must be JSON objects"))
            }
            Self::Update { id, .. } | Self::Delete { id } if blank_id(id) => {
                Err(ClientError::validation("Row id is required"))
            }
            Self::Update { patch, .. } if !patch.is_object() => {
                Err(ClientError::validation("Patch must be a JSON object"))
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Upsert(_) => "upsert",
        }
    }
}

/// Highest generation applied per refetch scope
#[derive(Debug, Default)]
struct Applied {
    all: u64,
    time_logs: u64,
}

/// Observable container over the gateway collections
pub struct OrderStore {
    gateway: Arc<dyn Gateway>,
    state: watch::Sender<Arc<StoreSnapshot>>,
    current_user: RwLock<Option<Profile>>,
    lifecycle: OrderLifecycle,
    generation: AtomicU64,
    applied: Mutex<Applied>,
    // 打卡的检查和写入必须串行
    attendance: tokio::sync::Mutex<()>,
}

impl OrderStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self {
            gateway,
            state,
            current_user: RwLock::new(None),
            lifecycle: OrderLifecycle::default(),
            generation: AtomicU64::new(0),
            applied: Mutex::new(Applied::default()),
            attendance: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_current_user(self, user: Profile) -> Self {
        *self.current_user.write() = Some(user);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: OrderLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Signed-in operator; `None` on sign-out
    pub fn set_current_user(&self, user: Option<Profile>) {
        *self.current_user.write() = user;
    }

    pub fn current_user(&self) -> Option<Profile> {
        self.current_user.read().clone()
    }

    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every applied refetch
    pub fn watch(&self) -> watch::Receiver<Arc<StoreSnapshot>> {
        self.state.subscribe()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn load<T: DeserializeOwned>(&self, table: Table) -> ClientResult<Vec<T>> {
        let rows = self
            .gateway
            .select(table, &SelectQuery::for_table(table))
            .await?;
        let total = rows.len();
        let decoded: Vec<T> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(%table, "Skipping undecodable row: {e}");
                    None
                }
            })
            .collect();
        if decoded.len() != total {
            debug!(%table, total, kept = decoded.len(), "Rows decoded");
        }
        Ok(decoded)
    }

    /// Reload every collection and replace the snapshot in one step
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> ClientResult<()> {
        let generation = self.next_generation();

        let result = tokio::try_join!(
            self.load::<Order>(Table::Orders),
            self.load::<Customer>(Table::Customers),
            self.load::<Store>(Table::Stores),
            self.load::<ServiceCategory>(Table::ServiceCategories),
            self.load::<KanbanColumn>(Table::KanbanColumns),
            self.load::<Profile>(Table::Profiles),
            self.load::<TimeLog>(Table::TimeLogs),
        );
        let (
            mut orders,
            customers,
            stores,
            mut service_categories,
            mut kanban_columns,
            mut users,
            mut time_logs,
        ) = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(generation, "Refetch failed: {e}");
                return Err(e);
            }
        };

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        kanban_columns.sort_by_key(|c| c.position);
        service_categories.sort_by_key(|c| c.position);
        time_logs.sort_by(|a, b| b.clock_in.cmp(&a.clock_in));

        if let Some(me) = self.current_user()
            && !users.iter().any(|u| u.id == me.id)
        {
            users.push(me);
        }

        let mut applied = self.applied.lock();
        if generation <= applied.all {
            debug!(generation, applied = applied.all, "Discarding stale refetch");
            return Ok(());
        }
        applied.all = generation;
        // 更新的考勤刷新已经生效时保留它
        let keep_logs = applied.time_logs > generation;
        applied.time_logs = applied.time_logs.max(generation);

        self.state.send_modify(|current| {
            let time_logs = if keep_logs {
                current.time_logs.clone()
            } else {
                time_logs
            };
            *current = Arc::new(StoreSnapshot {
                orders,
                customers,
                stores,
                service_categories,
                kanban_columns,
                users,
                time_logs,
                loaded: true,
            });
        });

        debug!(generation, "Snapshot replaced");
        Ok(())
    }

    /// Reload the attendance collection only
    #[instrument(skip(self))]
    pub async fn fetch_time_logs(&self) -> ClientResult<()> {
        let generation = self.next_generation();

        let mut time_logs = match self.load::<TimeLog>(Table::TimeLogs).await {
            Ok(logs) => logs,
            Err(e) => {
                error!(generation, "Attendance refetch failed: {e}");
                return Err(e);
            }
        };
        time_logs.sort_by(|a, b| b.clock_in.cmp(&a.clock_in));

        let mut applied = self.applied.lock();
        if generation <= applied.time_logs {
            debug!(generation, "Discarding stale attendance refetch");
            return Ok(());
        }
        applied.time_logs = generation;

        self.state.send_modify(|current| {
            let mut next = StoreSnapshot::clone(current);
            next.time_logs = time_logs;
            *current = Arc::new(next);
        });
        Ok(())
    }

    async fn refetch_after(&self, table: Table) -> ClientResult<()> {
        match table {
            Table::TimeLogs => self.fetch_time_logs().await,
            _ => self.fetch_all().await,
        }
    }

    /// Write through the gateway, then refetch before returning.
    ///
    /// A failed write leaves the snapshot untouched. A failed refetch after
    /// a successful write is returned too: the write happened, the snapshot
    /// may lag until the next refetch.
    #[instrument(skip(self, op), fields(table = %table, op = op.name()))]
    pub async fn mutate(&self, table: Table, op: MutationOp) -> ClientResult<()> {
        op.validate()?;

        let written = match op {
            MutationOp::Insert(rows) => self.gateway.insert(table, rows).await,
            MutationOp::Update { id, patch } => self.gateway.update(table, &id, patch).await,
            MutationOp::Delete { id } => self.gateway.delete(table, &id).await,
            MutationOp::Upsert(rows) => self.gateway.upsert(table, rows).await,
        };
        if let Err(e) = written {
            error!("Write failed: {e}");
            return Err(e);
        }

        self.refetch_after(table).await
    }

    // ========== Orders ==========

    /// Insert a fully priced order; the stored totals must follow its items
    pub async fn add_order(&self, order: &Order) -> ClientResult<()> {
        validate_items(&order.items)?;
        let snapshot = self.snapshot();
        let status = snapshot
            .stages(&self.lifecycle)
            .validate(order.status.as_str())?;

        let mut order = order.clone();
        order.check_totals()?;
        order.completed_at = self
            .lifecycle
            .completed_at_for_new(&status, order.created_at)
            .map(|stamp| order.completed_at.unwrap_or(stamp));
        order.status = status;

        self.mutate(Table::Orders, MutationOp::insert(&order)?).await?;
        info!(order_number = %order.order_number, "Order created");
        Ok(())
    }

    /// Patch an order; a status change keeps `completed_at` in step
    pub async fn update_order(&self, id: &str, mut update: OrderUpdate) -> ClientResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        if let Some(items) = &update.items {
            validate_items(items)?;
        }
        let snapshot = self.snapshot();
        if update.touches_pricing() {
            let mut priced = snapshot
                .order(id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("order {id}")))?;
            if let Some(items) = update.items.take() {
                priced.items = items;
            }
            priced.subtotal = update.subtotal.unwrap_or(priced.subtotal);
            priced.tax = update.tax.unwrap_or(priced.tax);
            priced.total = update.total.unwrap_or(priced.total);
            priced.check_totals()?;

            update.items = Some(priced.items);
            update.subtotal = Some(priced.subtotal);
            update.tax = Some(priced.tax);
            update.total = Some(priced.total);
        }
        if let Some(status) = update.status.take() {
            let stages = snapshot.stages(&self.lifecycle);
            let change = match snapshot.order(id) {
                Some(order) => self.lifecycle.transition(order, status.as_str(), &stages, Utc::now())?,
                None => {
                    let status = stages.validate(status.as_str())?;
                    let completed_at = self.lifecycle.completed_at_for_new(&status, Utc::now());
                    shared::order::StatusChange {
                        status,
                        completed_at,
                    }
                }
            };
            update.status = Some(change.status);
            update.completed_at = Some(change.completed_at);
        }

        self.mutate(Table::Orders, MutationOp::update(id, &update)?).await
    }

    /// Move an order to another pipeline status
    pub async fn update_order_status(&self, id: &str, status: &str) -> ClientResult<()> {
        let snapshot = self.snapshot();
        let order = snapshot
            .order(id)
            .ok_or_else(|| ClientError::NotFound(format!("order {id}")))?;
        let stages = snapshot.stages(&self.lifecycle);
        let change = self
            .lifecycle
            .transition(order, status, &stages, Utc::now())?;

        debug!(order = %order.order_number, from = %order.status, to = %change.status, "Status change");
        self.mutate(Table::Orders, MutationOp::update(id, &change.into_update())?)
            .await
    }

    pub async fn delete_order(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::Orders, MutationOp::delete(id)).await
    }

    // ========== Customers ==========

    pub async fn add_customer(&self, customer: &Customer) -> ClientResult<()> {
        if customer.first_name.trim().is_empty() && customer.last_name.trim().is_empty() {
            return Err(ClientError::validation("Customer name is required"));
        }
        self.mutate(Table::Customers, MutationOp::insert(customer)?)
            .await
    }

    pub async fn update_customer(&self, id: &str, update: &CustomerUpdate) -> ClientResult<()> {
        self.mutate(Table::Customers, MutationOp::update(id, update)?)
            .await
    }

    pub async fn delete_customer(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::Customers, MutationOp::delete(id)).await
    }

    // ========== Stores ==========

    pub async fn add_store(&self, store: &Store) -> ClientResult<()> {
        if store.name.trim().is_empty() {
            return Err(ClientError::validation("Store name is required"));
        }
        self.mutate(Table::Stores, MutationOp::insert(store)?).await
    }

    pub async fn update_store(&self, id: &str, update: &StoreUpdate) -> ClientResult<()> {
        self.mutate(Table::Stores, MutationOp::update(id, update)?)
            .await
    }

    pub async fn delete_store(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::Stores, MutationOp::delete(id)).await
    }

    // ========== Service categories ==========

    pub async fn add_service_category(&self, category: &ServiceCategory) -> ClientResult<()> {
        if category.name.trim().is_empty() {
            return Err(ClientError::validation("Category name is required"));
        }
        if category.base_price.is_sign_negative() && !category.base_price.is_zero() {
            return Err(ClientError::validation("Base price must be non-negative"));
        }
        self.mutate(Table::ServiceCategories, MutationOp::insert(category)?)
            .await
    }

    pub async fn update_service_category(
        &self,
        id: &str,
        update: &ServiceCategoryUpdate,
    ) -> ClientResult<()> {
        self.mutate(Table::ServiceCategories, MutationOp::update(id, update)?)
            .await
    }

    pub async fn delete_service_category(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::ServiceCategories, MutationOp::delete(id))
            .await
    }

    // ========== Kanban columns ==========

    /// Append a column at the end of the board
    pub async fn add_kanban_column(&self, status: &str, label: &str, color: &str) -> ClientResult<()> {
        let status = StatusKey::new(status)?;
        let snapshot = self.snapshot();
        if snapshot.kanban_columns.iter().any(|c| c.status == status) {
            return Err(ClientError::validation(format!(
                "A column for status {status} already exists"
            )));
        }

        let column = json!({
            "status": status,
            "label": label.trim(),
            "color": color,
            "position": snapshot.kanban_columns.len(),
        });
        self.mutate(Table::KanbanColumns, MutationOp::Insert(vec![column]))
            .await
    }

    pub async fn update_kanban_column(&self, id: &str, update: &KanbanColumnUpdate) -> ClientResult<()> {
        self.mutate(Table::KanbanColumns, MutationOp::update(id, update)?)
            .await
    }

    pub async fn delete_kanban_column(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::KanbanColumns, MutationOp::delete(id))
            .await
    }

    /// Move a column and persist every position.
    ///
    /// The new order is shown immediately; if the write fails the board is
    /// reloaded from the server.
    #[instrument(skip(self))]
    pub async fn reorder_kanban_columns(&self, from: usize, to: usize) -> ClientResult<()> {
        let snapshot = self.snapshot();
        if from >= snapshot.kanban_columns.len() {
            return Err(ClientError::validation(format!("No column at index {from}")));
        }
        let reordered = reorder_columns(&snapshot.kanban_columns, from, to);
        let rows = reordered
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        self.state.send_modify(|current| {
            let mut next = StoreSnapshot::clone(current);
            next.kanban_columns = reordered;
            *current = Arc::new(next);
        });

        if let Err(e) = self.gateway.upsert(Table::KanbanColumns, rows).await {
            error!("Column reorder failed, restoring board: {e}");
            if let Err(refetch) = self.fetch_all().await {
                warn!("Board restore failed: {refetch}");
            }
            return Err(e);
        }
        self.fetch_all().await
    }

    // ========== Profiles ==========

    pub async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> ClientResult<()> {
        self.mutate(Table::Profiles, MutationOp::update(id, update)?)
            .await
    }

    pub async fn delete_profile(&self, id: &str) -> ClientResult<()> {
        self.mutate(Table::Profiles, MutationOp::delete(id)).await
    }

    // ========== Attendance ==========

    fn signed_in(&self) -> ClientResult<Profile> {
        self.current_user()
            .ok_or_else(|| ClientError::validation("Not signed in"))
    }

    /// Open a time log for the signed-in operator
    #[instrument(skip(self))]
    pub async fn clock_in(&self) -> ClientResult<()> {
        let me = self.signed_in()?;
        let _serial = self.attendance.lock().await;

        // 另一台终端可能已打卡
        self.fetch_time_logs().await?;
        if self.snapshot().open_log(&me.id).is_some() {
            return Err(ClientError::validation("You are already clocked in"));
        }
        let log = TimeLogCreate {
            user_id: me.id.clone(),
            clock_in: Utc::now(),
        };
        self.mutate(Table::TimeLogs, MutationOp::insert(&log)?).await?;
        info!(user = %me.id, "Clocked in");
        Ok(())
    }

    /// Close the signed-in operator's open time log
    #[instrument(skip(self))]
    pub async fn clock_out(&self) -> ClientResult<()> {
        let me = self.signed_in()?;
        let _serial = self.attendance.lock().await;

        self.fetch_time_logs().await?;
        let open = self
            .snapshot()
            .open_log(&me.id)
            .map(|log| log.id.clone())
            .ok_or_else(|| ClientError::validation("No active clock-in found"))?;
        let patch = json!({ "clock_out": Utc::now() });
        self.mutate(Table::TimeLogs, MutationOp::Update { id: open, patch })
            .await?;
        info!(user = %me.id, "Clocked out");
        Ok(())
    }

    // ========== Push ==========

    /// Refetch on every change notification until the handle is dropped
    pub async fn subscribe(self: &Arc<Self>) -> ClientResult<SubscriptionHandle> {
        let mut feed = self.gateway.subscribe(&Table::ALL).await?;
        let store: Weak<Self> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                let Some(store) = store.upgrade() else {
                    break;
                };
                let result = match (event.table, event.kind) {
                    (Table::TimeLogs, kind) if kind != ChangeKind::Resync => {
                        store.fetch_time_logs().await
                    }
                    _ => store.fetch_all().await,
                };
                if let Err(e) = result {
                    warn!(table = %event.table, "Push refetch failed: {e}");
                }
            }
            debug!("Change subscription ended");
        });

        info!("Subscribed to change feed");
        Ok(SubscriptionHandle { task: Some(task) })
    }
}

/// Live change subscription; dropping it stops the refetch task
pub struct SubscriptionHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    #[test]
    fn test_mutation_validation() {
        assert!(MutationOp::Insert(vec![]).validate().is_err());
        assert!(MutationOp::Insert(vec![json!(1)]).validate().is_err());
        assert!(MutationOp::delete("  ").validate().is_err());
        assert!(
            MutationOp::Update {
                id: "x".into(),
                patch: json!("nope")
            }
            .validate()
            .is_err()
        );
        assert!(MutationOp::delete("x").validate().is_ok());
    }

    #[tokio::test]
    async fn test_stale_refetch_is_discarded() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = OrderStore::new(gateway.clone());

        // 模拟一个更晚开始的刷新已经生效
        store.applied.lock().all = 100;
        store.fetch_all().await.unwrap();
        assert!(!store.snapshot().loaded);

        store.applied.lock().all = 0;
        store.fetch_all().await.unwrap();
        assert!(store.snapshot().loaded);
    }

    #[tokio::test]
    async fn test_current_user_merged_into_users() {
        let gateway = Arc::new(MemoryGateway::new());
        let me = Profile {
            id: "u-1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: shared::models::Role::Manager,
            avatar: None,
        };
        let store = OrderStore::new(gateway).with_current_user(me.clone());
        store.fetch_all().await.unwrap();
        assert_eq!(store.snapshot().users, vec![me]);
    }
}
