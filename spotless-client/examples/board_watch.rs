//! Print the kanban board and reprint it on every change pushed by the gateway.
//!
//! SPOTLESS_GATEWAY_URL=... SPOTLESS_GATEWAY_KEY=... \
//!     cargo run -p spotless-client --example board_watch -- [config-dir]

use chrono::Utc;
use spotless_client::logger::init_logger;
use spotless_client::{BoardFilter, BoardView, HttpGateway, LocalConfigStorage, OrderStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let local = LocalConfigStorage::new(dir).resolve();
    let config = local.client_config()?;

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let store = Arc::new(OrderStore::new(gateway));
    store.fetch_all().await?;
    let _live = store.subscribe().await?;

    let mut changes = store.watch();
    loop {
        let snapshot = changes.borrow_and_update().clone();
        let view = BoardView::build(&snapshot, store.lifecycle(), &BoardFilter::default(), Utc::now());

        println!("--- {} orders on the board ---", view.order_count());
        for column in &view.columns {
            println!("{:<16} {:>3}", column.column.label, column.orders.len());
            for order in &column.orders {
                let flag = if order.is_priority { "!" } else { " " };
                println!("  {flag} {:<10} {:<24} ${:.2}", order.order_number, order.customer_name, order.total);
            }
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
