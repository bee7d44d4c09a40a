//! Usage logger.
//!
//! Records a consumption event and triggers the inventory decrement. The
//! two writes are independent network calls with no rollback: a failed
//! usage insert stops everything, but once the usage row is in, a missing
//! item on the decrement side leaves the usage record standing and is
//! reported on the receipt rather than unwound.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{ActionType, ClientContext, NewUsageLog, SessionContext, UsageLogEntry};
use crate::services::audit::{AuditEntryDraft, AuditService};
use crate::services::inventory::InventoryService;
use crate::store::{collections, QueryOptions, RecordStore};

const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Outcome of a usage submission. `inventory_updated = false` marks the
/// accepted inconsistency where the usage row landed but the item had
/// vanished before the decrement.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReceipt {
    pub entry: UsageLogEntry,
    pub inventory_updated: bool,
    pub remaining_quantity: Option<i64>,
}

#[derive(Clone)]
pub struct UsageService {
    store: Arc<dyn RecordStore>,
    inventory: Arc<InventoryService>,
    audit: Arc<AuditService>,
}

impl UsageService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        inventory: Arc<InventoryService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            store,
            inventory,
            audit,
        }
    }

    /// Logs a usage event: insert the immutable usage row (server-assigned
    /// timestamp), audit it, then decrement the item. A successful full
    /// pass leaves exactly two audit entries: one for `usage_logs` and one
    /// for the inventory quantity.
    #[instrument(skip(self, new_log, actor, client), fields(item_id = %new_log.item_id, units = new_log.units_used))]
    pub async fn log_usage(
        &self,
        new_log: NewUsageLog,
        actor: Option<&SessionContext>,
        client: &ClientContext,
    ) -> Result<UsageReceipt, ServiceError> {
        new_log
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let item_id = new_log.item_id.clone();
        let units_used = new_log.units_used;
        let purpose = new_log.purpose.clone();

        let record = new_log.into_record(Utc::now());
        let inserted = self.store.insert(collections::USAGE_LOGS, record).await?;
        let row = inserted.into_iter().next().ok_or_else(|| {
            ServiceError::InternalError(format!("store rejected usage log for item {}", item_id))
        })?;
        let entry: UsageLogEntry = serde_json::from_value(row)
            .map_err(|e| ServiceError::InternalError(format!("malformed usage row: {}", e)))?;

        info!(item_id = %item_id, units_used, "usage logged");
        self.audit
            .record(
                AuditEntryDraft::new(actor, client, ActionType::Usage, collections::USAGE_LOGS, &item_id)
                    .new_value(format!("{} units used", units_used))
                    .notes(purpose),
            )
            .await;

        match self
            .inventory
            .decrement(&item_id, units_used, actor, client, None)
            .await
        {
            Ok((_, remaining)) => Ok(UsageReceipt {
                entry,
                inventory_updated: true,
                remaining_quantity: Some(remaining),
            }),
            Err(ServiceError::NotFound(_)) => {
                warn!(
                    item_id = %item_id,
                    "usage recorded but item no longer exists; inventory unchanged"
                );
                Ok(UsageReceipt {
                    entry,
                    inventory_updated: false,
                    remaining_quantity: None,
                })
            }
            Err(err) => {
                warn!(
                    item_id = %item_id,
                    error = %err,
                    "usage recorded but decrement failed; inventory unchanged"
                );
                Ok(UsageReceipt {
                    entry,
                    inventory_updated: false,
                    remaining_quantity: None,
                })
            }
        }
    }

    /// Usage history, newest first. Feeds the stats and trend reducers.
    #[instrument(skip(self))]
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<UsageLogEntry>, ServiceError> {
        let opts =
            QueryOptions::newest_first("usage_date", limit.unwrap_or(DEFAULT_HISTORY_LIMIT));
        let rows = self.store.query(collections::USAGE_LOGS, &[], &opts).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<UsageLogEntry>(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(error = %err, "skipping malformed usage row"),
            }
        }
        Ok(entries)
    }
}
