use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kinds of change the audit trail distinguishes. Serialized in
/// SCREAMING_SNAKE_CASE to match the stored rows (`INVENTORY_USAGE` etc.).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Create,
    Add,
    Update,
    Delete,
    Usage,
    InventoryUsage,
    UserCreate,
    UserUpdate,
    UserDelete,
    Login,
    Logout,
}

/// One appended audit row. Never mutated, never deleted; old/new values are
/// stringified on write (this is a human-readable trail, not a replay log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: String,
    pub user_name: String,
    pub action_type: ActionType,
    pub table_name: String,
    pub record_id: String,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A single field's old/new pair, produced by the patch diffing on update
/// paths and recorded as one audit row per change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_types_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ActionType::InventoryUsage).unwrap(),
            "\"INVENTORY_USAGE\""
        );
        assert_eq!(
            serde_json::to_string(&ActionType::UserCreate).unwrap(),
            "\"USER_CREATE\""
        );
        assert_eq!(ActionType::Add.to_string(), "ADD");
    }

    #[test]
    fn action_types_round_trip() {
        let parsed: ActionType = serde_json::from_str("\"USAGE\"").unwrap();
        assert_eq!(parsed, ActionType::Usage);
        let parsed: ActionType = "LOGIN".parse().unwrap();
        assert_eq!(parsed, ActionType::Login);
    }
}
