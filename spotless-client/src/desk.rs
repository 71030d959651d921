//! Order intake desk
//!
//! Builds complete orders from counter input: customer capture, pricing at
//! the current tax rate, the board's first status, and a receipt for stores
//! that print silently.

use crate::error::{ClientError, ClientResult};
use crate::store::OrderStore;
use chrono::{Duration, Local, NaiveDate, Utc};
use parking_lot::RwLock;
use shared::models::{AppSettings, Customer, CustomerUpdate, Order, OrderItem, OrderUpdate};
use shared::order::{ItemLines, validate_items};
use shared::util::{new_id, order_number};
use spotless_printer::{PrintOutcome, ReceiptContext, ReceiptPrinter};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Days until pickup when the operator does not pick a date
pub const DEFAULT_PICKUP_DAYS: i64 = 2;

/// Address recorded for customers captured at the counter
const UNKNOWN_ADDRESS: &str = "N/A";

/// Customer captured at the counter
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub enum CustomerChoice {
    Existing(String),
    New(NewCustomer),
}

/// Counter input for a new order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerChoice,
    pub items: Vec<OrderItem>,
    /// Defaults to the first store
    pub store_id: Option<String>,
    pub pickup_date: Option<NaiveDate>,
    /// "HH:MM"; defaults to the settings
    pub pickup_time: Option<String>,
    pub is_priority: bool,
    pub hanger_number: Option<String>,
    pub special_handling: String,
}

impl NewOrder {
    pub fn new(customer: CustomerChoice, items: Vec<OrderItem>) -> Self {
        Self {
            customer,
            items,
            store_id: None,
            pickup_date: None,
            pickup_time: None,
            is_priority: false,
            hanger_number: None,
            special_handling: String::new(),
        }
    }

    pub fn with_store(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn with_pickup(mut self, date: NaiveDate, time: impl Into<String>) -> Self {
        self.pickup_date = Some(date);
        self.pickup_time = Some(time.into());
        self
    }

    pub fn with_priority(mut self, is_priority: bool) -> Self {
        self.is_priority = is_priority;
        self
    }
}

/// Edits allowed on an existing order
#[derive(Debug, Clone, Default)]
pub struct OrderEdit {
    pub items: Option<Vec<OrderItem>>,
    pub is_priority: Option<bool>,
    pub hanger_number: Option<String>,
    pub pickup_date: Option<String>,
    pub pickup_time: Option<String>,
    pub special_handling: Option<String>,
    pub store_id: Option<String>,
}

pub struct OrderDesk {
    store: Arc<OrderStore>,
    printer: Option<Arc<ReceiptPrinter>>,
    settings: RwLock<AppSettings>,
}

impl OrderDesk {
    pub fn new(store: Arc<OrderStore>, settings: AppSettings) -> Self {
        Self {
            store,
            printer: None,
            settings: RwLock::new(settings),
        }
    }

    pub fn with_printer(mut self, printer: Arc<ReceiptPrinter>) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.read().clone()
    }

    /// New tax rate and defaults apply to the next order or edit
    pub fn set_settings(&self, settings: AppSettings) {
        *self.settings.write() = settings;
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// Create the order (and its customer when new) and queue the receipt
    #[instrument(skip(self, input))]
    pub async fn create_order(&self, input: NewOrder) -> ClientResult<Order> {
        let lines = ItemLines::from_items(input.items)?;
        validate_items(lines.items())?;

        let settings = self.settings();
        let snapshot = self.store.snapshot();
        let store_id = match input.store_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => snapshot
                .stores
                .first()
                .map(|s| s.id.clone())
                .ok_or_else(|| ClientError::validation("No store available for the order"))?,
        };
        let totals = lines.totals(settings.tax_rate);
        let now = Utc::now();

        let customer = match input.customer {
            CustomerChoice::Existing(id) => {
                let existing = snapshot
                    .customer(&id)
                    .cloned()
                    .ok_or_else(|| ClientError::NotFound(format!("customer {id}")))?;
                let update = CustomerUpdate {
                    last_order_date: Some(now),
                    total_spent: Some(existing.total_spent + totals.total),
                    ..Default::default()
                };
                self.store.update_customer(&existing.id, &update).await?;
                existing
            }
            CustomerChoice::New(new) => {
                let customer = Customer {
                    id: new_id(),
                    first_name: new.first_name.trim().to_string(),
                    last_name: new.last_name.trim().to_string(),
                    email: new.email.trim().to_string(),
                    phone: new.phone.trim().to_string(),
                    address: UNKNOWN_ADDRESS.to_string(),
                    notes: None,
                    created_at: now,
                    last_order_date: None,
                    total_spent: Default::default(),
                };
                self.store.add_customer(&customer).await?;
                customer
            }
        };

        let lifecycle = self.store.lifecycle();
        let status = lifecycle.initial_status(&snapshot.kanban_columns);
        let pickup_date = input
            .pickup_date
            .unwrap_or_else(|| Local::now().date_naive() + Duration::days(DEFAULT_PICKUP_DAYS));

        let order = Order {
            id: new_id(),
            order_number: order_number(&settings.order_number_prefix),
            hanger_number: input.hanger_number.filter(|h| !h.trim().is_empty()),
            customer_id: customer.id.clone(),
            customer_name: customer.display_name(),
            completed_at: lifecycle.completed_at_for_new(&status, now),
            status,
            items: lines.into_items(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            created_at: now,
            pickup_date: pickup_date.format("%Y-%m-%d").to_string(),
            pickup_time: input
                .pickup_time
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(settings.default_pickup_time.clone()),
            is_priority: input.is_priority,
            store_id,
            special_handling: input.special_handling,
        };

        self.store.add_order(&order).await?;
        self.queue_receipt(&order, &customer, &settings);
        Ok(order)
    }

    /// 小票打印不阻塞下单, 失败只记录日志
    fn queue_receipt(&self, order: &Order, customer: &Customer, settings: &AppSettings) {
        let Some(printer) = self.printer.clone() else {
            return;
        };
        let Some(store) = self.store.snapshot().store(&order.store_id).cloned() else {
            warn!(store = %order.store_id, "Order store not found, no receipt");
            return;
        };
        if !store.print_enabled {
            return;
        }

        let order = order.clone();
        let customer = customer.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            let ctx = ReceiptContext::new(&order, &store, &settings).with_customer(Some(&customer));
            if let Err(e) = printer.print_receipt(&ctx).await {
                warn!(order = %order.order_number, "Receipt printing failed: {e}");
            }
        });
    }

    /// Apply counter edits, repricing at the current tax rate
    #[instrument(skip(self, edit))]
    pub async fn edit_order(&self, id: &str, edit: OrderEdit) -> ClientResult<()> {
        let snapshot = self.store.snapshot();
        let order = snapshot
            .order(id)
            .ok_or_else(|| ClientError::NotFound(format!("order {id}")))?;

        let mut priced = order.clone();
        if let Some(items) = edit.items {
            priced.items = ItemLines::from_items(items)?.into_items();
        }
        validate_items(&priced.items)?;
        let totals = priced.reprice(self.settings.read().tax_rate);

        let update = OrderUpdate {
            items: Some(priced.items),
            subtotal: Some(totals.subtotal),
            tax: Some(totals.tax),
            total: Some(totals.total),
            is_priority: edit.is_priority,
            hanger_number: edit.hanger_number,
            pickup_date: edit.pickup_date,
            pickup_time: edit.pickup_time,
            special_handling: edit.special_handling,
            store_id: edit.store_id,
            ..Default::default()
        };
        self.store.update_order(id, update).await?;
        info!(order = %order.order_number, total = %totals.total, "Order edited");
        Ok(())
    }

    /// Print the receipt again, waiting for the agent
    pub async fn reprint(&self, order_id: &str) -> ClientResult<PrintOutcome> {
        let printer = self
            .printer
            .as_ref()
            .ok_or_else(|| ClientError::Config("No print agent configured".into()))?;
        let snapshot = self.store.snapshot();
        let order = snapshot
            .order(order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {order_id}")))?;
        let store = snapshot
            .store(&order.store_id)
            .ok_or_else(|| ClientError::NotFound(format!("store {}", order.store_id)))?;
        let settings = self.settings();

        let ctx = ReceiptContext::new(order, store, &settings)
            .with_customer(snapshot.customer(&order.customer_id));
        Ok(printer.print_receipt(&ctx).await?)
    }
}
