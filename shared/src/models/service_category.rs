//! Service Category Model (price list entry)

use super::ServiceType;
use crate::wire;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Service category entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default)]
    pub service_type: ServiceType,
    /// Optional grouping label shown in the price list
    #[serde(
        default,
        alias = "class",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_string"
    )]
    pub class_tag: Option<String>,
    #[serde(default, deserialize_with = "wire::decimal")]
    pub base_price: Decimal,
    #[serde(default, deserialize_with = "wire::int")]
    pub position: i32,
}

/// Update service category payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

/// Find a category by its display name
pub fn find_category<'a>(categories: &'a [ServiceCategory], name: &str) -> Option<&'a ServiceCategory> {
    categories.iter().find(|c| c.name == name)
}
