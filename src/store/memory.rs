//! In-memory record store.
//!
//! Backs the test suites and the `store_backend = "in-memory"` configuration
//! used for local development where no hosted store is reachable. Rows are
//! plain JSON objects; inserts are assigned a sequential integer `id` when
//! the record carries none, matching the serial keys the hosted store
//! assigns.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{Filter, FilterOp, QueryOptions, RecordStore};
use crate::errors::StoreError;

#[derive(Default)]
pub struct InMemoryStore {
    collections: DashMap<String, Vec<Value>>,
    next_ids: DashMap<String, i64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row directly, bypassing id assignment. Test helper.
    pub fn seed(&self, collection: &str, row: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(row);
    }

    /// Number of rows currently in a collection. Test helper.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn alloc_id(&self, collection: &str) -> i64 {
        let mut entry = self.next_ids.entry(collection.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let field = row.get(&filter.field).unwrap_or(&Value::Null);
        match filter.op {
            FilterOp::Eq => field == &filter.value,
            FilterOp::Neq => field != &filter.value,
            FilterOp::Gte => compare(field, &filter.value).map_or(false, |o| o.is_ge()),
            FilterOp::Lte => compare(field, &filter.value).map_or(false, |o| o.is_le()),
            FilterOp::Like => match (field.as_str(), filter.value.as_str()) {
                (Some(actual), Some(pattern)) => like_match(actual, pattern),
                _ => false,
            },
        }
    })
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64().partial_cmp(&r.as_f64()),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// SQL LIKE with `%` wildcards, as PostgREST interprets `like.` patterns.
fn like_match(actual: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return actual == pattern;
    }
    let mut rest = actual;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn merge_patch(row: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(changes)) = (row, patch) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        opts: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let mut rows: Vec<Value> = self
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &opts.order_by {
            rows.sort_by(|a, b| {
                let left = a.get(field).unwrap_or(&Value::Null);
                let right = b.get(field).unwrap_or(&Value::Null);
                let ordering = compare(left, right).unwrap_or(std::cmp::Ordering::Equal);
                if opts.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = opts.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Vec<Value>, StoreError> {
        let mut row = match record {
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(StoreError::Serialization(serde_json::Error::io(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("expected JSON object, got {}", other),
                    ),
                )))
            }
        };
        if row.get("id").is_none() {
            let id = self.alloc_id(collection);
            if let Value::Object(map) = &mut row {
                map.insert("id".to_string(), Value::from(id));
            }
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(row.clone());
        Ok(vec![row])
    }

    async fn update(
        &self,
        collection: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let mut updated = Vec::new();
        if let Some(mut rows) = self.collections.get_mut(collection) {
            for row in rows.iter_mut() {
                if matches(row, filters) {
                    merge_patch(row, &patch);
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        let mut removed = Vec::new();
        if let Some(mut rows) = self.collections.get_mut(collection) {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows.drain(..) {
                if matches(&row, filters) {
                    removed.push(row);
                } else {
                    kept.push(row);
                }
            }
            *rows = kept;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let first = store
            .insert("usage_logs", json!({"item_id": "BIO-PPE-0001"}))
            .await
            .unwrap();
        let second = store
            .insert("usage_logs", json!({"item_id": "BIO-PPE-0002"}))
            .await
            .unwrap();
        assert_eq!(first[0]["id"], json!(1));
        assert_eq!(second[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn query_applies_and_semantics() {
        let store = InMemoryStore::new();
        store.seed("inventory", json!({"item_id": "A", "quantity": 5, "status": "Active"}));
        store.seed("inventory", json!({"item_id": "B", "quantity": 50, "status": "Active"}));

        let rows = store
            .query(
                "inventory",
                &[
                    Filter::eq("status", "Active"),
                    Filter::gte("quantity", 10),
                ],
                &QueryOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["item_id"], json!("B"));
    }

    #[tokio::test]
    async fn conditional_update_misses_when_value_moved() {
        let store = InMemoryStore::new();
        store.seed("inventory", json!({"item_id": "A", "quantity": 70}));

        // Filter carries a stale quantity; nothing should match.
        let updated = store
            .update(
                "inventory",
                &[Filter::eq("item_id", "A"), Filter::eq("quantity", 100)],
                json!({"quantity": 40}),
            )
            .await
            .unwrap();
        assert!(updated.is_empty());

        let rows = store
            .query("inventory", &[Filter::eq("item_id", "A")], &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(rows[0]["quantity"], json!(70));
    }

    #[tokio::test]
    async fn delete_returns_removed_rows() {
        let store = InMemoryStore::new();
        store.seed("users", json!({"username": "jdoe"}));
        store.seed("users", json!({"username": "asmith"}));

        let removed = store
            .delete("users", &[Filter::eq("username", "jdoe")])
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len("users"), 1);
    }

    #[tokio::test]
    async fn ordering_and_limit() {
        let store = InMemoryStore::new();
        store.seed("audit_logs", json!({"timestamp": "2026-01-01T00:00:00Z"}));
        store.seed("audit_logs", json!({"timestamp": "2026-03-01T00:00:00Z"}));
        store.seed("audit_logs", json!({"timestamp": "2026-02-01T00:00:00Z"}));

        let rows = store
            .query(
                "audit_logs",
                &[],
                &QueryOptions::newest_first("timestamp", 2),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["timestamp"], json!("2026-03-01T00:00:00Z"));
    }

    #[test]
    fn like_patterns() {
        assert!(like_match("Nitrile Gloves", "%Glove%"));
        assert!(like_match("Nitrile Gloves", "Nitrile%"));
        assert!(!like_match("Syringes", "%Glove%"));
    }
}
