//! Inventory mutation engine.
//!
//! All stock mutations flow through here: create, field-level update,
//! usage decrement, and status-flag retirement. Each successful mutation
//! emits its audit entries only after the store write is confirmed, and a
//! failed audit write never undoes the data write.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{
    ActionType, ClientContext, FieldChange, InventoryItem, InventoryPatch, NewInventoryItem,
    SessionContext,
};
use crate::services::audit::{AuditEntryDraft, AuditService};
use crate::store::{collections, Filter, QueryOptions, RecordStore};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn RecordStore>,
    audit: Arc<AuditService>,
    default_reorder_level: i64,
    decrement_max_retries: u32,
}

impl InventoryService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: Arc<AuditService>,
        default_reorder_level: i64,
        decrement_max_retries: u32,
    ) -> Self {
        Self {
            store,
            audit,
            default_reorder_level,
            decrement_max_retries,
        }
    }

    /// All items, active only unless asked otherwise.
    #[instrument(skip(self))]
    pub async fn list(&self, include_deleted: bool) -> Result<Vec<InventoryItem>, ServiceError> {
        let filters = if include_deleted {
            vec![]
        } else {
            vec![Filter::neq("status", "Deleted")]
        };
        let opts = QueryOptions {
            order_by: Some("item_name".to_string()),
            descending: false,
            limit: None,
        };
        let rows = self.store.query(collections::INVENTORY, &filters, &opts).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<InventoryItem>(row) {
                Ok(item) => items.push(item),
                Err(err) => warn!(error = %err, "skipping malformed inventory row"),
            }
        }
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, item_id: &str) -> Result<Option<InventoryItem>, ServiceError> {
        let rows = self
            .store
            .query(
                collections::INVENTORY,
                &[Filter::eq("item_id", item_id)],
                &QueryOptions::default(),
            )
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row).map_err(|e| {
                ServiceError::InternalError(format!("malformed inventory row: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    /// Creates an item. On success exactly one ADD audit entry is emitted
    /// with the item id as record id; a rejected insert produces no audit.
    #[instrument(skip(self, new_item, actor, client), fields(item_name = %new_item.item_name))]
    pub async fn add(
        &self,
        new_item: NewInventoryItem,
        actor: Option<&SessionContext>,
        client: &ClientContext,
    ) -> Result<InventoryItem, ServiceError> {
        new_item
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let item_id = self.next_item_id(&new_item).await?;
        let record = new_item.into_record(item_id.clone(), self.default_reorder_level);
        let summary = record.to_string();

        let inserted = self.store.insert(collections::INVENTORY, record).await?;
        let row = inserted.into_iter().next().ok_or_else(|| {
            ServiceError::InternalError(format!("store rejected insert of item {}", item_id))
        })?;
        let item: InventoryItem = serde_json::from_value(row)
            .map_err(|e| ServiceError::InternalError(format!("malformed inventory row: {}", e)))?;

        info!(item_id = %item.item_id, quantity = item.quantity, "inventory item added");
        self.audit
            .record(
                AuditEntryDraft::new(actor, client, ActionType::Add, collections::INVENTORY, &item.item_id)
                    .new_value(summary),
            )
            .await;
        Ok(item)
    }

    /// Applies a partial update. The pre-read drives a field-level diff;
    /// an empty diff writes nothing and audits nothing. Otherwise one
    /// UPDATE audit entry is emitted per changed field.
    #[instrument(skip(self, patch, actor, client))]
    pub async fn update(
        &self,
        item_id: &str,
        patch: InventoryPatch,
        actor: Option<&SessionContext>,
        client: &ClientContext,
    ) -> Result<Vec<FieldChange>, ServiceError> {
        if let Some(quantity) = patch.quantity {
            if quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "quantity must not be negative".to_string(),
                ));
            }
        }

        let current = self
            .get(item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("inventory item {}", item_id)))?;

        let changes = patch.diff_against(&current);
        if changes.is_empty() {
            return Ok(changes);
        }

        let store_patch = patch.to_store_patch(&changes);
        let updated = self
            .store
            .update(
                collections::INVENTORY,
                &[Filter::eq("item_id", item_id)],
                store_patch,
            )
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "store rejected update of item {}",
                item_id
            )));
        }

        info!(item_id, changed_fields = changes.len(), "inventory item updated");
        self.audit
            .record_field_changes(
                actor,
                client,
                ActionType::Update,
                collections::INVENTORY,
                item_id,
                &changes,
            )
            .await;
        Ok(changes)
    }

    /// Reduces stock by `amount`, clamped at zero. The write is an
    /// optimistic conditional update keyed on the observed quantity, so a
    /// concurrent decrement makes it match nothing and the read is
    /// retried. Returns the (old, new) quantity pair and emits exactly one
    /// INVENTORY_USAGE audit entry on success.
    #[instrument(skip(self, actor, client, notes))]
    pub async fn decrement(
        &self,
        item_id: &str,
        amount: i64,
        actor: Option<&SessionContext>,
        client: &ClientContext,
        notes: Option<String>,
    ) -> Result<(i64, i64), ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "decrement amount must be a positive integer".to_string(),
            ));
        }

        for attempt in 0..self.decrement_max_retries {
            let current = self
                .get(item_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("inventory item {}", item_id)))?;

            let old_quantity = current.quantity;
            let new_quantity = (old_quantity - amount).max(0);

            let updated = self
                .store
                .update(
                    collections::INVENTORY,
                    &[
                        Filter::eq("item_id", item_id),
                        Filter::eq("quantity", old_quantity),
                    ],
                    json!({
                        "quantity": new_quantity,
                        "last_updated": chrono::Utc::now().to_rfc3339(),
                    }),
                )
                .await?;

            if updated.is_empty() {
                warn!(item_id, attempt, "decrement lost a conditional write; retrying");
                continue;
            }

            if old_quantity < amount {
                info!(
                    item_id,
                    requested = amount,
                    available = old_quantity,
                    "decrement clamped at zero"
                );
            }
            info!(item_id, old_quantity, new_quantity, "inventory decremented");

            let mut draft = AuditEntryDraft::new(
                actor,
                client,
                ActionType::InventoryUsage,
                collections::INVENTORY,
                item_id,
            )
            .field("quantity")
            .values(old_quantity.to_string(), new_quantity.to_string());
            if let Some(notes) = notes {
                draft = draft.notes(notes);
            }
            self.audit.record(draft).await;

            return Ok((old_quantity, new_quantity));
        }

        Err(ServiceError::Conflict(format!(
            "could not decrement item {} after {} attempts",
            item_id, self.decrement_max_retries
        )))
    }

    /// Retires an item by flipping its status; nothing is physically
    /// deleted, so historical usage and audit rows keep resolving.
    #[instrument(skip(self, actor, client))]
    pub async fn delete(
        &self,
        item_id: &str,
        actor: Option<&SessionContext>,
        client: &ClientContext,
    ) -> Result<(), ServiceError> {
        let current = self
            .get(item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("inventory item {}", item_id)))?;

        let updated = self
            .store
            .update(
                collections::INVENTORY,
                &[Filter::eq("item_id", item_id)],
                json!({
                    "status": "Deleted",
                    "last_updated": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "store rejected delete of item {}",
                item_id
            )));
        }

        info!(item_id, "inventory item retired");
        self.audit
            .record(
                AuditEntryDraft::new(actor, client, ActionType::Delete, collections::INVENTORY, item_id)
                    .field("status")
                    .values("Active", "Deleted")
                    .notes(format!("retired {}", current.item_name)),
            )
            .await;
        Ok(())
    }

    /// Item ids follow `BIO-<CAT3>-<seq:04>`: category code plus a
    /// sequence derived from the current row count.
    async fn next_item_id(&self, new_item: &NewInventoryItem) -> Result<String, ServiceError> {
        let existing = self
            .store
            .query(collections::INVENTORY, &[], &QueryOptions::default())
            .await?;
        Ok(format!(
            "BIO-{}-{:04}",
            new_item.category_code(),
            existing.len() + 1
        ))
    }
}
