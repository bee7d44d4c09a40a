use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use super::audit::FieldChange;

/// Lifecycle flag. Items are never physically deleted; retired stock is
/// status-flagged so historical usage and audit rows keep resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ItemStatus {
    #[default]
    Active,
    Deleted,
}

/// A stocked consumable as stored in the `inventory` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    /// Unit count; never negative (decrements clamp at zero).
    pub quantity: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: i64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub last_updated: Option<String>,
}

fn default_unit() -> String {
    "Units".to_string()
}

fn default_reorder_level() -> i64 {
    50
}

impl InventoryItem {
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

/// Input for creating an inventory item. The item id is generated by the
/// service, not supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInventoryItem {
    #[validate(length(min = 1, message = "item_name is required"))]
    pub item_name: String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub reorder_level: Option<i64>,
    #[serde(default)]
    pub notes: String,
}

impl NewInventoryItem {
    /// Category code for id generation: first three alphanumerics,
    /// uppercased ("PPE" -> "PPE", "Labware" -> "LAB").
    pub fn category_code(&self) -> String {
        let code: String = self
            .category
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        if code.is_empty() {
            "GEN".to_string()
        } else {
            code
        }
    }

    pub fn into_record(self, item_id: String, default_reorder_level: i64) -> Value {
        json!({
            "item_id": item_id,
            "item_name": self.item_name,
            "category": self.category,
            "quantity": self.quantity,
            "unit": self.unit,
            "storage_location": self.storage_location,
            "supplier": self.supplier,
            "expiry_date": self.expiry_date.map(|d| d.to_string()),
            "reorder_level": self.reorder_level.unwrap_or(default_reorder_level),
            "notes": self.notes,
            "status": "Active",
            "last_updated": Utc::now().to_rfc3339(),
        })
    }
}

/// Partial update for an inventory item. `expiry_date` is double-optional:
/// absent leaves the stored date alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InventoryPatch {
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub storage_location: Option<String>,
    pub supplier: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<Option<NaiveDate>>,
    pub reorder_level: Option<i64>,
    pub notes: Option<String>,
}

/// serde shim so `"expiry_date": null` deserializes as `Some(None)` (clear)
/// while an absent key stays `None` (leave unchanged).
mod double_option {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<NaiveDate>::deserialize(de).map(Some)
    }

    pub fn serialize<S>(value: &Option<Option<NaiveDate>>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(ser),
            None => ser.serialize_none(),
        }
    }
}

impl InventoryPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.category.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.storage_location.is_none()
            && self.supplier.is_none()
            && self.expiry_date.is_none()
            && self.reorder_level.is_none()
            && self.notes.is_none()
    }

    /// Field-level diff against the stored record. Unchanged fields are
    /// skipped entirely, so an effectively empty patch yields no changes
    /// and therefore no audit entries.
    pub fn diff_against(&self, current: &InventoryItem) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        let mut push = |field: &str, old: String, new: String| {
            if old != new {
                changes.push(FieldChange {
                    field: field.to_string(),
                    old_value: old,
                    new_value: new,
                });
            }
        };

        if let Some(name) = &self.item_name {
            push("item_name", current.item_name.clone(), name.clone());
        }
        if let Some(category) = &self.category {
            push("category", current.category.clone(), category.clone());
        }
        if let Some(quantity) = self.quantity {
            push("quantity", current.quantity.to_string(), quantity.to_string());
        }
        if let Some(unit) = &self.unit {
            push("unit", current.unit.clone(), unit.clone());
        }
        if let Some(location) = &self.storage_location {
            push(
                "storage_location",
                current.storage_location.clone(),
                location.clone(),
            );
        }
        if let Some(supplier) = &self.supplier {
            push("supplier", current.supplier.clone(), supplier.clone());
        }
        if let Some(expiry) = &self.expiry_date {
            push(
                "expiry_date",
                render_date(&current.expiry_date),
                render_date(expiry),
            );
        }
        if let Some(level) = self.reorder_level {
            push(
                "reorder_level",
                current.reorder_level.to_string(),
                level.to_string(),
            );
        }
        if let Some(notes) = &self.notes {
            push("notes", current.notes.clone(), notes.clone());
        }
        changes
    }

    /// Store patch carrying only the changed fields (plus the bumped
    /// `last_updated` stamp).
    pub fn to_store_patch(&self, changes: &[FieldChange]) -> Value {
        let changed: std::collections::HashSet<&str> =
            changes.iter().map(|c| c.field.as_str()).collect();
        let mut patch = Map::new();
        if changed.contains("item_name") {
            patch.insert("item_name".into(), json!(self.item_name));
        }
        if changed.contains("category") {
            patch.insert("category".into(), json!(self.category));
        }
        if changed.contains("quantity") {
            patch.insert("quantity".into(), json!(self.quantity));
        }
        if changed.contains("unit") {
            patch.insert("unit".into(), json!(self.unit));
        }
        if changed.contains("storage_location") {
            patch.insert("storage_location".into(), json!(self.storage_location));
        }
        if changed.contains("supplier") {
            patch.insert("supplier".into(), json!(self.supplier));
        }
        if changed.contains("expiry_date") {
            let value = self
                .expiry_date
                .as_ref()
                .and_then(|d| d.as_ref())
                .map(|d| d.to_string());
            patch.insert("expiry_date".into(), json!(value));
        }
        if changed.contains("reorder_level") {
            patch.insert("reorder_level".into(), json!(self.reorder_level));
        }
        if changed.contains("notes") {
            patch.insert("notes".into(), json!(self.notes));
        }
        patch.insert("last_updated".into(), json!(Utc::now().to_rfc3339()));
        Value::Object(patch)
    }
}

fn render_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_item() -> InventoryItem {
        InventoryItem {
            item_id: "BIO-PPE-0001".into(),
            item_name: "Nitrile Gloves".into(),
            category: "PPE".into(),
            quantity: 100,
            unit: "Units".into(),
            storage_location: "Main Store".into(),
            supplier: "Standard Supplier".into(),
            expiry_date: None,
            reorder_level: 50,
            notes: String::new(),
            status: ItemStatus::Active,
            last_updated: None,
        }
    }

    #[test]
    fn category_code_truncates_and_uppercases() {
        let new = NewInventoryItem {
            item_name: "Falcon Tubes".into(),
            category: "Labware".into(),
            quantity: 10,
            unit: default_unit(),
            storage_location: String::new(),
            supplier: String::new(),
            expiry_date: None,
            reorder_level: None,
            notes: String::new(),
        };
        assert_eq!(new.category_code(), "LAB");
    }

    #[test]
    fn empty_diff_for_identical_patch() {
        let item = stored_item();
        let patch = InventoryPatch {
            quantity: Some(100),
            storage_location: Some("Main Store".into()),
            ..Default::default()
        };
        assert!(patch.diff_against(&item).is_empty());
    }

    #[test]
    fn diff_reports_changed_fields_only() {
        let item = stored_item();
        let patch = InventoryPatch {
            quantity: Some(70),
            storage_location: Some("Main Store".into()),
            notes: Some("restocked".into()),
            ..Default::default()
        };
        let changes = patch.diff_against(&item);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["quantity", "notes"]);
        assert_eq!(changes[0].old_value, "100");
        assert_eq!(changes[0].new_value, "70");
    }

    #[test]
    fn clearing_expiry_diffs_against_stored_date() {
        let mut item = stored_item();
        item.expiry_date = Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        let patch = InventoryPatch {
            expiry_date: Some(None),
            ..Default::default()
        };
        let changes = patch.diff_against(&item);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "expiry_date");
        assert_eq!(changes[0].old_value, "2026-12-31");
        assert_eq!(changes[0].new_value, "None");
    }

    #[test]
    fn store_patch_restricted_to_changed_fields() {
        let item = stored_item();
        let patch = InventoryPatch {
            quantity: Some(70),
            storage_location: Some("Main Store".into()),
            ..Default::default()
        };
        let changes = patch.diff_against(&item);
        let value = patch.to_store_patch(&changes);
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("quantity"));
        assert!(!obj.contains_key("storage_location"));
        assert!(obj.contains_key("last_updated"));
    }

    #[test]
    fn low_stock_includes_boundary() {
        let mut item = stored_item();
        item.quantity = 50;
        assert!(item.is_low_stock());
        item.quantity = 51;
        assert!(!item.is_low_stock());
    }
}
