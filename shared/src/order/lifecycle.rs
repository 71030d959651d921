//! Status transitions and board visibility.

use super::error::OrderResult;
use super::status::{PipelineStages, StatusKey};
use crate::models::{KanbanColumn, Order, OrderUpdate};
use chrono::{DateTime, Duration, Utc};

/// How long a completed order stays on the board
pub const DEFAULT_VISIBILITY_WINDOW_HOURS: i64 = 48;

/// Result of moving an order to a status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: StatusKey,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    /// Patch that writes exactly this change
    pub fn into_update(self) -> OrderUpdate {
        OrderUpdate {
            status: Some(self.status),
            completed_at: Some(self.completed_at),
            ..Default::default()
        }
    }

    pub fn apply(&self, order: &mut Order) {
        order.status = self.status.clone();
        order.completed_at = self.completed_at;
    }
}

/// Lifecycle rules; the pipeline itself comes from the board columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLifecycle {
    completed: StatusKey,
    visibility_window: Duration,
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self {
            completed: StatusKey::completed(),
            visibility_window: Duration::hours(DEFAULT_VISIBILITY_WINDOW_HOURS),
        }
    }
}

impl OrderLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completed_status(mut self, status: StatusKey) -> Self {
        self.completed = status;
        self
    }

    pub fn with_visibility_window(mut self, window: Duration) -> Self {
        self.visibility_window = window;
        self
    }

    pub fn completed_status(&self) -> &StatusKey {
        &self.completed
    }

    pub fn is_completed(&self, order: &Order) -> bool {
        order.status == self.completed
    }

    pub fn stages(&self, columns: &[KanbanColumn]) -> PipelineStages {
        PipelineStages::from_columns(columns, &self.completed)
    }

    /// Move `order` to `target`.
    ///
    /// Any configured status may follow any other. Entering the completed
    /// status stamps `completed_at = now`, leaving it clears the stamp.
    /// Staying in completed keeps the original stamp.
    pub fn transition(
        &self,
        order: &Order,
        target: &str,
        stages: &PipelineStages,
        now: DateTime<Utc>,
    ) -> OrderResult<StatusChange> {
        let status = stages.validate(target)?;
        let completed_at = if status == self.completed {
            if self.is_completed(order) {
                order.completed_at.or(Some(now))
            } else {
                Some(now)
            }
        } else {
            None
        };
        Ok(StatusChange {
            status,
            completed_at,
        })
    }

    /// `completed_at` a freshly created order should carry
    pub fn completed_at_for_new(
        &self,
        status: &StatusKey,
        created_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        (status == &self.completed).then_some(created_at)
    }

    /// Board visibility at read time.
    ///
    /// Completed orders drop off once strictly more than the window has
    /// passed since completion; a completed order with no stamp is hidden.
    /// Orders in any other status are always shown.
    pub fn is_on_board(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if !self.is_completed(order) {
            return true;
        }
        match order.completed_at {
            Some(completed_at) => now - completed_at <= self.visibility_window,
            None => false,
        }
    }

    /// First column by position, or RECEIVED when the board is empty
    pub fn initial_status(&self, columns: &[KanbanColumn]) -> StatusKey {
        columns
            .iter()
            .min_by_key(|c| c.position)
            .map(|c| c.status.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderError;
    use rust_decimal::Decimal;

    fn column(status: &str, position: i32) -> KanbanColumn {
        KanbanColumn {
            id: format!("col-{status}"),
            status: StatusKey::new(status).unwrap(),
            label: status.to_string(),
            color: String::new(),
            position,
        }
    }

    fn board() -> Vec<KanbanColumn> {
        vec![
            column("CLEANING", 1),
            column("RECEIVED", 0),
            column("READY", 2),
            column("COMPLETED", 3),
            column("HOLD", 4),
        ]
    }

    fn order(status: &str, completed_at: Option<DateTime<Utc>>) -> Order {
        Order {
            id: "o-1".into(),
            order_number: "ORD-1000".into(),
            hanger_number: None,
            customer_id: "c-1".into(),
            customer_name: "Doe, Jane".into(),
            status: StatusKey::new(status).unwrap(),
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            created_at: Utc::now(),
            completed_at,
            pickup_date: String::new(),
            pickup_time: String::new(),
            is_priority: false,
            store_id: "s-1".into(),
            special_handling: String::new(),
        }
    }

    #[test]
    fn test_completion_stamp_follows_status() {
        let lifecycle = OrderLifecycle::new();
        let stages = lifecycle.stages(&board());
        let t0 = Utc::now();
        let mut o = order("RECEIVED", None);

        let path = ["CLEANING", "COMPLETED", "HOLD", "COMPLETED", "READY", "RECEIVED"];
        for (step, target) in path.iter().enumerate() {
            let now = t0 + Duration::minutes(step as i64);
            let change = lifecycle.transition(&o, target, &stages, now).unwrap();
            change.apply(&mut o);
            assert_eq!(o.completed_at.is_some(), lifecycle.is_completed(&o), "after {target}");
            if *target == "COMPLETED" {
                assert_eq!(o.completed_at, Some(now));
            }
        }
    }

    #[test]
    fn test_staying_completed_keeps_stamp() {
        let lifecycle = OrderLifecycle::new();
        let stages = lifecycle.stages(&board());
        let stamped = Utc::now() - Duration::hours(3);
        let o = order("COMPLETED", Some(stamped));
        let change = lifecycle.transition(&o, "COMPLETED", &stages, Utc::now()).unwrap();
        assert_eq!(change.completed_at, Some(stamped));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let lifecycle = OrderLifecycle::new();
        let stages = lifecycle.stages(&board());
        let o = order("RECEIVED", None);
        assert_eq!(
            lifecycle.transition(&o, "LOST", &stages, Utc::now()),
            Err(OrderError::UnknownStatus("LOST".into()))
        );
    }

    #[test]
    fn test_visibility_window_boundary() {
        let lifecycle = OrderLifecycle::new();
        let now = Utc::now();

        let old = order("COMPLETED", Some(now - Duration::hours(48) - Duration::minutes(1)));
        assert!(!lifecycle.is_on_board(&old, now));

        let recent = order("COMPLETED", Some(now - Duration::hours(47) - Duration::minutes(59)));
        assert!(lifecycle.is_on_board(&recent, now));

        let exact = order("COMPLETED", Some(now - Duration::hours(48)));
        assert!(lifecycle.is_on_board(&exact, now));

        let unstamped = order("COMPLETED", None);
        assert!(!lifecycle.is_on_board(&unstamped, now));

        let ancient_hold = order("HOLD", None);
        assert!(lifecycle.is_on_board(&ancient_hold, now));
    }

    #[test]
    fn test_initial_status() {
        let lifecycle = OrderLifecycle::new();
        assert_eq!(lifecycle.initial_status(&board()).as_str(), "RECEIVED");
        assert_eq!(lifecycle.initial_status(&[]).as_str(), "RECEIVED");
    }

    #[test]
    fn test_status_change_patch() {
        let change = StatusChange {
            status: StatusKey::new("READY").unwrap(),
            completed_at: None,
        };
        let json = serde_json::to_value(change.into_update()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "READY", "completed_at": null}));
    }
}
