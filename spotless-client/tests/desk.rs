//! Order intake against the in-memory gateway and print agent

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::json;
use shared::Table;
use shared::models::{AppSettings, OrderItem, ServiceType};
use shared::order::OrderError;
use spotless_client::{
    ClientError, CustomerChoice, MemoryGateway, NewCustomer, NewOrder, OrderDesk, OrderEdit,
    OrderStore,
};
use spotless_printer::{MemoryPrintAgent, PrintConfig, PrintOutcome, ReceiptPrinter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(category: &str, quantity: u32, price: &str) -> OrderItem {
    OrderItem {
        id: shared::util::new_id(),
        category: category.into(),
        service_type: ServiceType::new(ServiceType::DRY_CLEAN),
        quantity,
        unit_price: d(price),
        total: Decimal::ZERO,
        notes: None,
    }
}

struct Counter {
    gateway: Arc<MemoryGateway>,
    agent: Arc<MemoryPrintAgent>,
    desk: OrderDesk,
}

async fn counter(print_enabled: bool) -> Counter {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed(
        Table::KanbanColumns,
        vec![
            json!({"id": "k2", "status": "CLEANING", "label": "Cleaning", "position": 1}),
            json!({"id": "k1", "status": "INTAKE", "label": "Intake", "position": 0}),
        ],
    );
    gateway.seed(
        Table::Stores,
        vec![json!({"id": "s-1", "name": "Downtown", "qz_enabled": print_enabled, "qz_printer_name": "Counter"})],
    );
    gateway.seed(
        Table::Customers,
        vec![json!({"id": "c-1", "first_name": "Jane", "last_name": "Doe",
                    "created_at": "2025-01-01T00:00:00Z", "total_spent": "100.00"})],
    );

    let store = Arc::new(OrderStore::new(gateway.clone()));
    store.fetch_all().await.unwrap();

    let agent = Arc::new(MemoryPrintAgent::new(["Counter", "Receipt"]));
    let printer = Arc::new(ReceiptPrinter::new(agent.clone()).with_config(PrintConfig::new()));
    let settings = AppSettings {
        tax_rate: d("0.08"),
        order_number_prefix: "ORD".into(),
        ..Default::default()
    };
    let desk = OrderDesk::new(store, settings).with_printer(printer);

    Counter {
        gateway,
        agent,
        desk,
    }
}

#[tokio::test]
async fn test_new_customer_order() {
    let c = counter(false).await;
    let input = NewOrder::new(
        CustomerChoice::New(NewCustomer {
            first_name: " Ana ".into(),
            last_name: "Lopez".into(),
            phone: "555-0100".into(),
            email: String::new(),
        }),
        vec![item("Suit (2pc)", 2, "15.50"), item("Tie", 1, "4")],
    );

    let order = c.desk.create_order(input).await.unwrap();

    assert_eq!(order.customer_name, "Lopez, Ana");
    assert_eq!(order.status, "INTAKE");
    assert!(order.completed_at.is_none());
    assert_eq!(order.store_id, "s-1");
    assert_eq!(order.subtotal, d("35.00"));
    assert_eq!(order.tax, d("2.80"));
    assert_eq!(order.total, d("37.80"));
    assert_eq!(order.items[0].total, d("31.00"));
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.pickup_time, "17:00");
    let expected = Local::now().date_naive() + ChronoDuration::days(2);
    assert_eq!(order.pickup_date, expected.format("%Y-%m-%d").to_string());

    let snapshot = c.desk.store().snapshot();
    assert_eq!(snapshot.order(&order.id), Some(&order));
    let customer = snapshot.customer(&order.customer_id).unwrap();
    assert_eq!(customer.address, "N/A");
    assert_eq!(customer.total_spent, Decimal::ZERO);
    assert!(c.agent.jobs().is_empty());
}

#[tokio::test]
async fn test_existing_customer_accumulates_spend() {
    let c = counter(false).await;
    let input = NewOrder::new(CustomerChoice::Existing("c-1".into()), vec![item("Shirt", 5, "3")])
        .with_pickup(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), "10:30")
        .with_priority(true);

    let order = c.desk.create_order(input).await.unwrap();
    assert_eq!(order.pickup_date, "2025-03-14");
    assert_eq!(order.pickup_time, "10:30");
    assert!(order.is_priority);

    let snapshot = c.desk.store().snapshot();
    let customer = snapshot.customer("c-1").unwrap();
    assert_eq!(customer.total_spent, d("116.20"));
    assert!(customer.last_order_date.is_some());
}

#[tokio::test]
async fn test_unknown_customer_and_empty_items_write_nothing() {
    let c = counter(false).await;

    let err = c
        .desk
        .create_order(NewOrder::new(CustomerChoice::Existing("ghost".into()), vec![item("Shirt", 1, "3")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    let err = c
        .desk
        .create_order(NewOrder::new(CustomerChoice::Existing("c-1".into()), vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Order(OrderError::EmptyItems)));
    assert!(c.gateway.rows(Table::Orders).is_empty());
}

#[tokio::test]
async fn test_receipt_printed_for_printing_store() {
    let c = counter(true).await;
    let order = c
        .desk
        .create_order(NewOrder::new(CustomerChoice::Existing("c-1".into()), vec![item("Coat", 1, "22")]))
        .await
        .unwrap();

    // 小票在后台发送
    for _ in 0..50 {
        if !c.agent.jobs().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let jobs = c.agent.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].printer, "Counter");
    assert!(jobs[0].data[0].data.contains(&order.order_number));

    let outcome = c.desk.reprint(&order.id).await.unwrap();
    assert_eq!(outcome, PrintOutcome::Printed { printer: "Counter".into() });
    assert_eq!(c.agent.jobs().len(), 2);
}

#[tokio::test]
async fn test_print_failure_does_not_fail_order() {
    let c = counter(true).await;
    c.agent.set_offline(true);

    let order = c
        .desk
        .create_order(NewOrder::new(CustomerChoice::Existing("c-1".into()), vec![item("Coat", 1, "22")]))
        .await
        .unwrap();
    assert!(c.desk.store().snapshot().order(&order.id).is_some());

    let err = c.desk.reprint(&order.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Print(_)));
}

#[tokio::test]
async fn test_edit_reprices_at_current_rate() {
    let c = counter(false).await;
    let order = c
        .desk
        .create_order(NewOrder::new(CustomerChoice::Existing("c-1".into()), vec![item("Shirt", 2, "5")]))
        .await
        .unwrap();

    c.desk.set_settings(AppSettings {
        tax_rate: d("0.10"),
        ..c.desk.settings()
    });
    c.desk
        .edit_order(
            &order.id,
            OrderEdit {
                items: Some(vec![item("Shirt", 3, "5")]),
                hanger_number: Some("H-12".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let snapshot = c.desk.store().snapshot();
    let edited = snapshot.order(&order.id).unwrap();
    assert_eq!(edited.subtotal, d("15"));
    assert_eq!(edited.tax, d("1.5"));
    assert_eq!(edited.total, d("16.5"));
    assert_eq!(edited.hanger_number.as_deref(), Some("H-12"));
    assert_eq!(edited.status, order.status);

    let err = c
        .desk
        .edit_order(&order.id, OrderEdit { items: Some(vec![]), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Order(OrderError::EmptyItems)));
}
