//! Board view: orders grouped by pipeline column
//!
//! Pure functions of a snapshot. Visibility is decided at read time, so the
//! same snapshot renders differently as completed orders age out.

use crate::store::StoreSnapshot;
use chrono::{DateTime, Utc};
use shared::models::{KanbanColumn, Order};
use shared::order::OrderLifecycle;
use std::convert::Infallible;
use std::str::FromStr;

/// Which store's orders to show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationFilter {
    #[default]
    All,
    Store(String),
}

impl LocationFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Store(id) => order.store_id == *id,
        }
    }
}

/// "all" (any case) or a store id
impl FromStr for LocationFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("all") {
            LocationFilter::All
        } else {
            LocationFilter::Store(s.to_string())
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    pub search: String,
    pub location: LocationFilter,
}

impl BoardFilter {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_location(mut self, location: LocationFilter) -> Self {
        self.location = location;
        self
    }

    /// Case-insensitive match on customer name, order number or hanger
    pub fn matches_search(&self, order: &Order) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        order.customer_name.to_lowercase().contains(&needle)
            || order.order_number.to_lowercase().contains(&needle)
            || order
                .hanger_number
                .as_deref()
                .is_some_and(|h| h.to_lowercase().contains(&needle))
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.location.matches(order) && self.matches_search(order)
    }
}

#[derive(Debug, Clone)]
pub struct BoardColumn {
    pub column: KanbanColumn,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
}

impl BoardView {
    pub fn build(
        snapshot: &StoreSnapshot,
        lifecycle: &OrderLifecycle,
        filter: &BoardFilter,
        now: DateTime<Utc>,
    ) -> Self {
        let visible: Vec<&Order> = snapshot
            .orders
            .iter()
            .filter(|o| lifecycle.is_on_board(o, now) && filter.matches(o))
            .collect();

        let mut columns: Vec<&KanbanColumn> = snapshot.kanban_columns.iter().collect();
        columns.sort_by_key(|c| c.position);

        let columns = columns
            .into_iter()
            .map(|column| BoardColumn {
                column: column.clone(),
                orders: visible
                    .iter()
                    .filter(|o| o.status == column.status)
                    .map(|o| (*o).clone())
                    .collect(),
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, status: &str) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.column.status == status)
    }

    pub fn order_count(&self) -> usize {
        self.columns.iter().map(|c| c.orders.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared::order::StatusKey;

    fn column(status: &str, position: i32) -> KanbanColumn {
        KanbanColumn {
            id: format!("k-{status}"),
            status: StatusKey::new(status).unwrap(),
            label: status.to_string(),
            color: String::new(),
            position,
        }
    }

    fn order(id: &str, status: &str, store: &str, completed_hours_ago: Option<i64>) -> Order {
        let now = Utc::now();
        Order {
            id: id.into(),
            order_number: format!("ORD-{id}"),
            customer_name: "Doe, Jane".into(),
            status: StatusKey::new(status).unwrap(),
            store_id: store.into(),
            created_at: now - Duration::days(3),
            completed_at: completed_hours_ago.map(|h| now - Duration::hours(h)),
            ..Default::default()
        }
    }

    fn snapshot() -> StoreSnapshot {
        StoreSnapshot {
            kanban_columns: vec![column("COMPLETED", 2), column("RECEIVED", 0), column("READY", 1)],
            orders: vec![
                order("1", "RECEIVED", "s1", None),
                order("2", "READY", "s2", None),
                order("3", "COMPLETED", "s1", Some(47)),
                order("4", "COMPLETED", "s1", Some(49)),
            ],
            loaded: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_columns_follow_position_and_hide_aged_orders() {
        let view = BoardView::build(
            &snapshot(),
            &OrderLifecycle::default(),
            &BoardFilter::default(),
            Utc::now(),
        );
        let statuses: Vec<_> = view.columns.iter().map(|c| c.column.status.as_str()).collect();
        assert_eq!(statuses, vec!["RECEIVED", "READY", "COMPLETED"]);
        assert_eq!(view.column("COMPLETED").unwrap().orders.len(), 1);
        assert_eq!(view.order_count(), 3);
    }

    #[test]
    fn test_search_and_location() {
        let mut snap = snapshot();
        snap.orders[1].hanger_number = Some("H-77".into());

        let filter = BoardFilter::default().with_search("h-7");
        let view = BoardView::build(&snap, &OrderLifecycle::default(), &filter, Utc::now());
        assert_eq!(view.order_count(), 1);
        assert_eq!(view.column("READY").unwrap().orders[0].id, "2");

        let filter = BoardFilter::default().with_location("s1".parse().unwrap());
        let view = BoardView::build(&snap, &OrderLifecycle::default(), &filter, Utc::now());
        assert_eq!(view.order_count(), 2);

        assert_eq!("ALL".parse::<LocationFilter>().unwrap(), LocationFilter::All);
    }
}
