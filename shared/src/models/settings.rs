//! Application settings (local singleton)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Console-wide settings, persisted locally with last-write-wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Fraction, e.g. 0.08 for 8%
    pub tax_rate: Decimal,
    /// "HH:MM"
    pub default_pickup_time: String,
    pub order_number_prefix: String,
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            default_pickup_time: "17:00".to_string(),
            order_number_prefix: "ORD".to_string(),
            company_name: "Spotless Dry Cleaning".to_string(),
            company_address: String::new(),
            company_phone: String::new(),
        }
    }
}
