//! Dashboard, analytics and attendance figures derived from a snapshot

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Customer, Order, Profile, ServiceType, TimeLog};
use shared::order::{OrderLifecycle, READY_STATUS, StatusKey};
use std::collections::BTreeMap;

/// Customers created within this many days count as new
pub const NEW_CUSTOMER_DAYS: i64 = 30;
/// Days covered by the trend charts
pub const TREND_DAYS: usize = 7;
/// Spenders listed in the lifetime value report
pub const TOP_SPENDERS: usize = 5;

const UNKNOWN_USER: &str = "Unknown User";
const ACTIVE: &str = "Active...";

/// Headline figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub live_orders: usize,
    /// Sum of completed order totals
    pub revenue: Decimal,
    pub pending_pickups: usize,
    pub new_customers: usize,
}

impl DashboardStats {
    pub fn compute(
        orders: &[Order],
        customers: &[Customer],
        lifecycle: &OrderLifecycle,
        now: DateTime<Utc>,
    ) -> Self {
        let since = now - Duration::days(NEW_CUSTOMER_DAYS);
        Self {
            live_orders: orders.len(),
            revenue: orders
                .iter()
                .filter(|o| lifecycle.is_completed(o))
                .map(|o| o.total)
                .sum(),
            pending_pickups: orders.iter().filter(|o| o.status == READY_STATUS).count(),
            new_customers: customers.iter().filter(|c| c.created_at >= since).count(),
        }
    }
}

/// One day of a trend chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub orders: usize,
    pub revenue: Decimal,
}

impl DailyPoint {
    /// "Mon"
    pub fn weekday_label(&self) -> String {
        self.date.format("%a").to_string()
    }

    /// "Mar 7"
    pub fn short_label(&self) -> String {
        self.date.format("%b %-d").to_string()
    }
}

/// Orders matching `include` grouped by creation day, oldest day first,
/// ending at `today`
pub fn daily_trend<F>(orders: &[Order], today: NaiveDate, days: usize, include: F) -> Vec<DailyPoint>
where
    F: Fn(&Order) -> bool,
{
    (0..days)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back as i64);
            let (count, revenue) = orders
                .iter()
                .filter(|o| o.created_at.date_naive() == date && include(o))
                .fold((0usize, Decimal::ZERO), |(n, sum), o| (n + 1, sum + o.total));
            DailyPoint {
                date,
                orders: count,
                revenue,
            }
        })
        .collect()
}

/// Revenue of completed orders over the last week
pub fn completed_trend(orders: &[Order], lifecycle: &OrderLifecycle, today: NaiveDate) -> Vec<DailyPoint> {
    daily_trend(orders, today, TREND_DAYS, |o| lifecycle.is_completed(o))
}

/// Volume of all orders over the last week
pub fn weekly_volume(orders: &[Order], today: NaiveDate) -> Vec<DailyPoint> {
    daily_trend(orders, today, TREND_DAYS, |_| true)
}

/// Item revenue per service type, largest first; zero rows dropped
pub fn revenue_by_service(orders: &[Order]) -> Vec<(ServiceType, Decimal)> {
    let mut totals: BTreeMap<ServiceType, Decimal> = BTreeMap::new();
    for item in orders.iter().flat_map(|o| o.items.iter()) {
        *totals.entry(item.service_type.clone()).or_default() += item.total;
    }
    let mut rows: Vec<_> = totals.into_iter().filter(|(_, v)| !v.is_zero()).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

/// Orders per status
pub fn status_counts(orders: &[Order]) -> BTreeMap<StatusKey, usize> {
    let mut counts = BTreeMap::new();
    for order in orders {
        *counts.entry(order.status.clone()).or_insert(0) += 1;
    }
    counts
}

/// Busiest non-completed status; ties go to the first key in order
pub fn bottleneck(orders: &[Order], lifecycle: &OrderLifecycle) -> Option<(StatusKey, usize)> {
    status_counts(orders)
        .into_iter()
        .filter(|(status, _)| status != lifecycle.completed_status())
        .fold(None, |best: Option<(StatusKey, usize)>, (status, count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((status, count)),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifetimeValue {
    pub average: Decimal,
    pub top_spenders: Vec<Customer>,
}

impl LifetimeValue {
    pub fn compute(customers: &[Customer]) -> Self {
        let average = if customers.is_empty() {
            Decimal::ZERO
        } else {
            let sum: Decimal = customers.iter().map(|c| c.total_spent).sum();
            (sum / Decimal::from(customers.len())).round_dp(2)
        };

        let mut ranked = customers.to_vec();
        ranked.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
        ranked.truncate(TOP_SPENDERS);

        Self {
            average,
            top_spenders: ranked,
        }
    }
}

/// "Jane D."
pub fn spender_label(customer: &Customer) -> String {
    match customer.last_name.trim().chars().next() {
        Some(initial) => format!("{} {initial}.", customer.first_name.trim()),
        None => customer.first_name.trim().to_string(),
    }
}

// ========== Attendance ==========

/// "{h}h {m}m", or "Active..." while the log is open
pub fn log_duration(log: &TimeLog) -> String {
    match log.clock_out {
        Some(out) => {
            let minutes = (out - log.clock_in).num_minutes().max(0);
            format!("{}h {}m", minutes / 60, minutes % 60)
        }
        None => ACTIVE.to_string(),
    }
}

/// Logs `viewer` may see; managers can narrow to one user
pub fn visible_logs<'a>(
    logs: &'a [TimeLog],
    viewer: &Profile,
    user_filter: Option<&str>,
) -> Vec<&'a TimeLog> {
    let target = if viewer.role.can_manage_settings() {
        user_filter.filter(|id| !id.is_empty() && *id != "all")
    } else {
        Some(viewer.id.as_str())
    };
    logs.iter()
        .filter(|log| target.is_none_or(|id| log.user_id == id))
        .collect()
}

pub fn user_name<'a>(users: &'a [Profile], user_id: &str) -> &'a str {
    users
        .iter()
        .find(|u| u.id == user_id && !u.name.trim().is_empty())
        .map(|u| u.name.as_str())
        .unwrap_or(UNKNOWN_USER)
}

/// Logs still open
pub fn active_count(logs: &[TimeLog]) -> usize {
    logs.iter().filter(|l| l.is_open()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderItem, Role};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn order(status: &str, created: &str, total: i64) -> Order {
        Order {
            id: shared::util::new_id(),
            status: StatusKey::new(status).unwrap(),
            created_at: ts(created),
            total: Decimal::from(total),
            ..Default::default()
        }
    }

    fn item(service: &str, total: i64) -> OrderItem {
        OrderItem {
            id: shared::util::new_id(),
            category: "Shirt".into(),
            service_type: ServiceType::new(service),
            quantity: 1,
            unit_price: Decimal::from(total),
            total: Decimal::from(total),
            notes: None,
        }
    }

    fn customer(first: &str, spent: i64, created: &str) -> Customer {
        Customer {
            id: first.to_lowercase(),
            first_name: first.into(),
            last_name: "Smith".into(),
            total_spent: Decimal::from(spent),
            created_at: ts(created),
            ..Default::default()
        }
    }

    #[test]
    fn test_dashboard_stats() {
        let now = ts("2025-03-10T12:00:00Z");
        let orders = vec![
            order("COMPLETED", "2025-03-09T10:00:00Z", 40),
            order("COMPLETED", "2025-03-08T10:00:00Z", 10),
            order("READY", "2025-03-08T10:00:00Z", 99),
            order("RECEIVED", "2025-03-08T10:00:00Z", 5),
        ];
        let customers = vec![
            customer("Old", 0, "2024-01-01T00:00:00Z"),
            customer("New", 0, "2025-03-01T00:00:00Z"),
        ];
        let stats = DashboardStats::compute(&orders, &customers, &OrderLifecycle::default(), now);
        assert_eq!(stats.live_orders, 4);
        assert_eq!(stats.revenue, Decimal::from(50));
        assert_eq!(stats.pending_pickups, 1);
        assert_eq!(stats.new_customers, 1);
    }

    #[test]
    fn test_completed_trend_covers_seven_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let orders = vec![
            order("COMPLETED", "2025-03-10T08:00:00Z", 20),
            order("COMPLETED", "2025-03-10T09:00:00Z", 5),
            order("READY", "2025-03-10T09:00:00Z", 70),
            order("COMPLETED", "2025-03-01T09:00:00Z", 70),
        ];
        let trend = completed_trend(&orders, &OrderLifecycle::default(), today);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        let last = trend.last().unwrap();
        assert_eq!((last.orders, last.revenue), (2, Decimal::from(25)));
        assert_eq!(last.weekday_label(), "Mon");
        assert_eq!(last.short_label(), "Mar 10");

        let volume = weekly_volume(&orders, today);
        assert_eq!(volume.last().unwrap().orders, 3);
    }

    #[test]
    fn test_revenue_by_service_drops_zero_rows() {
        let mut a = order("READY", "2025-03-10T08:00:00Z", 0);
        a.items = vec![item("Dry Clean", 30), item("Launder", 0)];
        let mut b = order("READY", "2025-03-10T08:00:00Z", 0);
        b.items = vec![item("Alteration", 45), item("Dry Clean", 5)];

        let rows = revenue_by_service(&[a, b]);
        assert_eq!(
            rows,
            vec![
                (ServiceType::new("Alteration"), Decimal::from(45)),
                (ServiceType::new("Dry Clean"), Decimal::from(35)),
            ]
        );
    }

    #[test]
    fn test_bottleneck_ignores_completed() {
        let orders = vec![
            order("COMPLETED", "2025-03-10T08:00:00Z", 0),
            order("COMPLETED", "2025-03-10T08:00:00Z", 0),
            order("COMPLETED", "2025-03-10T08:00:00Z", 0),
            order("PRESSING", "2025-03-10T08:00:00Z", 0),
            order("PRESSING", "2025-03-10T08:00:00Z", 0),
            order("RECEIVED", "2025-03-10T08:00:00Z", 0),
        ];
        let (status, count) = bottleneck(&orders, &OrderLifecycle::default()).unwrap();
        assert_eq!((status.as_str(), count), ("PRESSING", 2));
        assert!(bottleneck(&[], &OrderLifecycle::default()).is_none());
    }

    #[test]
    fn test_lifetime_value() {
        let created = "2025-01-01T00:00:00Z";
        let customers: Vec<_> = (1..=6)
            .map(|i| customer(&format!("C{i}"), i * 10, created))
            .collect();
        let clv = LifetimeValue::compute(&customers);
        assert_eq!(clv.average, Decimal::from(35));
        assert_eq!(clv.top_spenders.len(), 5);
        assert_eq!(clv.top_spenders[0].first_name, "C6");
        assert_eq!(spender_label(&clv.top_spenders[0]), "C6 S.");
        assert_eq!(LifetimeValue::compute(&[]).average, Decimal::ZERO);
    }

    fn log(user: &str, clock_in: &str, clock_out: Option<&str>) -> TimeLog {
        TimeLog {
            id: shared::util::new_id(),
            user_id: user.into(),
            clock_in: ts(clock_in),
            clock_out: clock_out.map(ts),
            notes: None,
        }
    }

    fn profile(id: &str, role: Role) -> Profile {
        Profile {
            id: id.into(),
            name: id.to_uppercase(),
            email: String::new(),
            role,
            avatar: None,
        }
    }

    #[test]
    fn test_log_duration() {
        let closed = log("u1", "2025-03-10T08:00:00Z", Some("2025-03-10T16:45:30Z"));
        assert_eq!(log_duration(&closed), "8h 45m");
        let open = log("u1", "2025-03-10T08:00:00Z", None);
        assert_eq!(log_duration(&open), "Active...");
    }

    #[test]
    fn test_log_visibility_by_role() {
        let logs = vec![
            log("u1", "2025-03-10T08:00:00Z", None),
            log("u2", "2025-03-10T08:00:00Z", None),
        ];

        let staff = profile("u1", Role::Staff);
        assert_eq!(visible_logs(&logs, &staff, Some("u2")).len(), 1);
        assert_eq!(visible_logs(&logs, &staff, None)[0].user_id, "u1");

        let manager = profile("m", Role::Manager);
        assert_eq!(visible_logs(&logs, &manager, None).len(), 2);
        assert_eq!(visible_logs(&logs, &manager, Some("all")).len(), 2);
        assert_eq!(visible_logs(&logs, &manager, Some("u2"))[0].user_id, "u2");

        let users = vec![profile("u1", Role::Staff)];
        assert_eq!(user_name(&users, "u1"), "U1");
        assert_eq!(user_name(&users, "ghost"), "Unknown User");
        assert_eq!(active_count(&logs), 2);
    }
}
