//! Status keys and the live pipeline they are checked against.
//!
//! Pipeline stages are data: operators add, rename and reorder kanban
//! columns at runtime, so a status is a validated string rather than an enum.

use super::error::{OrderError, OrderResult};
use crate::models::KanbanColumn;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Status assigned to completed orders unless configured otherwise
pub const DEFAULT_COMPLETED_STATUS: &str = "COMPLETED";
/// Status for new orders when the board has no columns
pub const DEFAULT_INITIAL_STATUS: &str = "RECEIVED";
/// Orders waiting for the customer
pub const READY_STATUS: &str = "READY";

/// A trimmed, non-empty pipeline status
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StatusKey(String);

impl StatusKey {
    /// Strict constructor for operator input
    pub fn new(raw: impl AsRef<str>) -> OrderResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(OrderError::UnknownStatus(String::new()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn completed() -> Self {
        Self(DEFAULT_COMPLETED_STATUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StatusKey {
    fn default() -> Self {
        Self(DEFAULT_INITIAL_STATUS.to_string())
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StatusKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StatusKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StatusKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// Stored rows are trusted as-is; a blank status reads as the initial one.
impl<'de> Deserialize<'de> for StatusKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::new(&raw).unwrap_or_default())
    }
}

/// The statuses an order may currently hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStages {
    keys: BTreeSet<StatusKey>,
    completed: StatusKey,
    open: bool,
}

impl PipelineStages {
    /// Build from the board columns; the completed key is always allowed
    pub fn from_columns(columns: &[KanbanColumn], completed: &StatusKey) -> Self {
        let mut keys: BTreeSet<StatusKey> = columns.iter().map(|c| c.status.clone()).collect();
        keys.insert(completed.clone());
        Self {
            keys,
            completed: completed.clone(),
            open: false,
        }
    }

    /// Accepts any well-formed key (board columns not loaded yet)
    pub fn unrestricted(completed: &StatusKey) -> Self {
        Self {
            open: true,
            ..Self::from_columns(&[], completed)
        }
    }

    pub fn contains(&self, key: &StatusKey) -> bool {
        self.open || self.keys.contains(key)
    }

    /// Resolve operator input into a known status key
    pub fn validate(&self, raw: &str) -> OrderResult<StatusKey> {
        let key = StatusKey::new(raw)?;
        if self.contains(&key) {
            Ok(key)
        } else {
            Err(OrderError::UnknownStatus(key.0))
        }
    }

    pub fn completed(&self) -> &StatusKey {
        &self.completed
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
