//! Store (physical location) Model

use crate::wire;
use serde::{Deserialize, Serialize};

/// Store entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub address: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub phone: String,
    /// Silent receipt printing through the local print agent
    #[serde(
        default,
        rename = "qz_enabled",
        alias = "qzEnabled",
        alias = "print_enabled",
        deserialize_with = "wire::boolean"
    )]
    pub print_enabled: bool,
    #[serde(
        default,
        rename = "qz_printer_name",
        alias = "qzPrinterName",
        alias = "printer_name",
        deserialize_with = "wire::opt_string"
    )]
    pub printer_name: Option<String>,
}

/// Update store payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "qz_enabled", skip_serializing_if = "Option::is_none")]
    pub print_enabled: Option<bool>,
    #[serde(rename = "qz_printer_name", skip_serializing_if = "Option::is_none")]
    pub printer_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_accepts_legacy_print_columns() {
        let store: Store = serde_json::from_str(
            r#"{"id":"s-1","name":"Downtown","qzEnabled":true,"qzPrinterName":"EPSON TM-T20"}"#,
        )
        .unwrap();
        assert!(store.print_enabled);
        assert_eq!(store.printer_name.as_deref(), Some("EPSON TM-T20"));
        assert_eq!(store.address, "");

        let row = serde_json::to_value(&store).unwrap();
        assert_eq!(row["qz_enabled"], true);
        assert_eq!(row["qz_printer_name"], "EPSON TM-T20");
    }
}
