//! Time Log Model (staff attendance)

use crate::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendance record; open while `clock_out` is empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLog {
    #[serde(deserialize_with = "wire::string")]
    pub id: String,
    #[serde(deserialize_with = "wire::string")]
    pub user_id: String,
    pub clock_in: DateTime<Utc>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "wire::opt_string")]
    pub notes: Option<String>,
}

impl TimeLog {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }
}

/// Insert payload; the gateway assigns the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLogCreate {
    pub user_id: String,
    pub clock_in: DateTime<Utc>,
}

/// The open log for `user_id`, if any
pub fn open_log_for<'a>(logs: &'a [TimeLog], user_id: &str) -> Option<&'a TimeLog> {
    logs.iter().find(|log| log.user_id == user_id && log.is_open())
}
