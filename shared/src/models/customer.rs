//! Customer Model

use crate::wire;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub email: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub phone: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "wire::opt_string")]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_order_date: Option<DateTime<Utc>>,
    /// Running sum of order totals (incremented at order creation only)
    #[serde(default, deserialize_with = "wire::decimal")]
    pub total_spent: Decimal,
}

impl Customer {
    /// "Last, First", the form snapshotted onto orders
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name.trim(), self.first_name.trim())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Update customer payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_order_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_row_with_string_total() {
        let customer: Customer = serde_json::from_str(
            r#"{"id":"c-1","first_name":"Jane","last_name":"Doe","email":null,
                "created_at":"2024-01-01T00:00:00Z","total_spent":"120.40"}"#,
        )
        .unwrap();
        assert_eq!(customer.display_name(), "Doe, Jane");
        assert_eq!(customer.email, "");
        assert_eq!(customer.total_spent, Decimal::new(12040, 2));
        assert!(customer.last_order_date.is_none());
    }
}
