//! Staff profile Model

use crate::wire;
use serde::{Deserialize, Serialize};

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    #[serde(other)]
    Staff,
}

impl Role {
    pub fn can_manage_settings(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Staff profile (one per signed-in identity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub email: String,
    #[serde(default, deserialize_with = "role_or_staff")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "wire::opt_string")]
    pub avatar: Option<String>,
}

fn role_or_staff<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Role>::deserialize(deserializer)?.unwrap_or_default())
}

/// Update profile payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
