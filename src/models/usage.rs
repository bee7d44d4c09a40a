use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// A consumption event as stored in `usage_logs`. Immutable once created;
/// `item_name` is a denormalized snapshot so the row stays readable after
/// the item itself is renamed or retired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub item_id: String,
    pub item_name: String,
    pub units_used: i64,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub used_by: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub notes: String,
    pub usage_date: DateTime<Utc>,
}

/// Input for logging a usage event. `usage_date` is server-assigned at
/// write time and cannot be supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUsageLog {
    #[validate(length(min = 1, message = "item_id is required"))]
    pub item_id: String,
    #[validate(length(min = 1, message = "item_name is required"))]
    pub item_name: String,
    #[validate(range(min = 1, message = "units_used must be a positive integer"))]
    pub units_used: i64,
    #[validate(length(min = 1, message = "purpose is required"))]
    pub purpose: String,
    #[serde(default)]
    pub used_by: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub notes: String,
}

impl NewUsageLog {
    pub fn into_record(self, usage_date: DateTime<Utc>) -> Value {
        json!({
            "item_id": self.item_id,
            "item_name": self.item_name,
            "units_used": self.units_used,
            "purpose": self.purpose,
            "used_by": self.used_by,
            "department": self.department,
            "notes": self.notes,
            "usage_date": usage_date.to_rfc3339(),
        })
    }
}
