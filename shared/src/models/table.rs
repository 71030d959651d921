use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gateway tables the console reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Orders,
    Customers,
    Stores,
    ServiceCategories,
    KanbanColumns,
    Profiles,
    TimeLogs,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Orders,
        Table::Customers,
        Table::Stores,
        Table::ServiceCategories,
        Table::KanbanColumns,
        Table::Profiles,
        Table::TimeLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Orders => "orders",
            Table::Customers => "customers",
            Table::Stores => "stores",
            Table::ServiceCategories => "service_categories",
            Table::KanbanColumns => "kanban_columns",
            Table::Profiles => "profiles",
            Table::TimeLogs => "time_logs",
        }
    }

    /// Column the table is listed by, and whether descending
    pub fn default_order(&self) -> Option<(&'static str, bool)> {
        match self {
            Table::Orders => Some(("created_at", true)),
            Table::KanbanColumns => Some(("position", false)),
            Table::TimeLogs => Some(("clock_in", true)),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}
