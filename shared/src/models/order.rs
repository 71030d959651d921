//! Order Model

use crate::order::StatusKey;
use crate::wire;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Service type tag carried by items and categories.
///
/// Open-ended: shops add their own, the four below are what a fresh
/// install ships with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceType(String);

impl ServiceType {
    pub const DRY_CLEAN: &'static str = "Dry Clean";
    pub const LAUNDER: &'static str = "Launder";
    pub const ALTERATION: &'static str = "Alteration";
    pub const SPECIALTY: &'static str = "Specialty";

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            Self::default()
        } else {
            Self(name.trim().to_string())
        }
    }

    pub fn known() -> [ServiceType; 4] {
        [
            Self::new(Self::DRY_CLEAN),
            Self::new(Self::LAUNDER),
            Self::new(Self::ALTERATION),
            Self::new(Self::SPECIALTY),
        ]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceType {
    fn default() -> Self {
        Self(Self::DRY_CLEAN.to_string())
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ServiceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::new(raw))
    }
}

/// Garment line on an order.
///
/// Lives inside the order's JSON `items` column, which the console writes
/// in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub category: String,
    #[serde(default, alias = "service_type")]
    pub service_type: ServiceType,
    #[serde(default = "one", deserialize_with = "quantity")]
    pub quantity: u32,
    #[serde(default, alias = "unit_price", deserialize_with = "wire::decimal")]
    pub unit_price: Decimal,
    /// quantity × unit_price
    #[serde(default, deserialize_with = "wire::decimal")]
    pub total: Decimal,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_string"
    )]
    pub notes: Option<String>,
}

fn one() -> u32 {
    1
}

fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = wire::int(deserializer)?;
    Ok(raw.max(1) as u32)
}

/// Order entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "wire::opt_string")]
    pub hanger_number: Option<String>,
    #[serde(default, deserialize_with = "wire::string")]
    pub customer_id: String,
    /// "Last, First" snapshot taken at creation
    #[serde(default, deserialize_with = "wire::string")]
    pub customer_name: String,
    #[serde(default)]
    pub status: StatusKey,
    #[serde(default, deserialize_with = "wire::json_list")]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "wire::decimal")]
    pub subtotal: Decimal,
    #[serde(default, deserialize_with = "wire::decimal")]
    pub tax: Decimal,
    #[serde(default, deserialize_with = "wire::decimal")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    /// Present exactly when the order sits in the completed state
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::string")]
    pub pickup_date: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub pickup_time: String,
    #[serde(default, deserialize_with = "wire::boolean")]
    pub is_priority: bool,
    #[serde(default, deserialize_with = "wire::string")]
    pub store_id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub special_handling: String,
}

impl Order {
    pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Update order payload (only present fields are sent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hanger_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusKey>,
    /// Outer `None` leaves the column alone, `Some(None)` clears it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_priority: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_handling: Option<String>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().is_none_or(|o| o.is_empty()))
            .unwrap_or(true)
    }

    pub fn touches_pricing(&self) -> bool {
        self.items.is_some() || self.subtotal.is_some() || self.tax.is_some() || self.total.is_some()
    }
}
