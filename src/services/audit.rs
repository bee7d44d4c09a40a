//! Audit trail recorder and queries.
//!
//! Every mutating operation in the service appends here. Recording is
//! best-effort by contract: a failed audit write is logged for operator
//! visibility and reported as `false`, but it never rolls back or fails the
//! mutation that triggered it, and [`AuditService::record`] never returns
//! an error.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{instrument, warn};

use crate::errors::ServiceError;
use crate::models::{ActionType, AuditLogEntry, ClientContext, FieldChange, SessionContext};
use crate::store::{collections, Filter, QueryOptions, RecordStore};

const DEFAULT_QUERY_LIMIT: usize = 1000;

/// One audit row about to be appended. `actor: None` attributes the entry
/// to the synthetic system identity.
#[derive(Debug, Clone)]
pub struct AuditEntryDraft {
    pub actor: Option<SessionContext>,
    pub client: ClientContext,
    pub action_type: ActionType,
    pub table_name: String,
    pub record_id: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub notes: Option<String>,
}

impl AuditEntryDraft {
    pub fn new(
        actor: Option<&SessionContext>,
        client: &ClientContext,
        action_type: ActionType,
        table_name: &str,
        record_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.cloned(),
            client: client.clone(),
            action_type,
            table_name: table_name.to_string(),
            record_id: record_id.into(),
            field_name: None,
            old_value: None,
            new_value: None,
            notes: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn values(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_value = Some(old.into());
        self.new_value = Some(new.into());
        self
    }

    pub fn new_value(mut self, new: impl Into<String>) -> Self {
        self.new_value = Some(new.into());
        self
    }

    pub fn old_value(mut self, old: impl Into<String>) -> Self {
        self.old_value = Some(old.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Filters for browsing the trail.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AuditQuery {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub action_type: Option<ActionType>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub struct AuditService {
    store: Arc<dyn RecordStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Appends one audit row. Returns whether the write landed; failure is
    /// logged and swallowed here so callers can stay on their own success
    /// path.
    #[instrument(skip(self, draft), fields(action = %draft.action_type, table = %draft.table_name))]
    pub async fn record(&self, draft: AuditEntryDraft) -> bool {
        let actor = draft.actor.unwrap_or_else(SessionContext::system);
        let row = json!({
            "user_id": actor.username,
            "user_name": actor.full_name,
            "action_type": draft.action_type,
            "table_name": draft.table_name,
            "record_id": draft.record_id,
            "field_name": draft.field_name,
            "old_value": draft.old_value,
            "new_value": draft.new_value,
            "notes": draft.notes,
            "ip_address": draft.client.ip_address,
            "user_agent": draft.client.user_agent,
            "timestamp": Utc::now().to_rfc3339(),
        });

        match self.store.insert(collections::AUDIT_LOGS, row).await {
            Ok(rows) if !rows.is_empty() => true,
            Ok(_) => {
                warn!(
                    table = %draft.table_name,
                    record_id = %draft.record_id,
                    "audit write returned no rows; entry lost"
                );
                false
            }
            Err(err) => {
                warn!(
                    table = %draft.table_name,
                    record_id = %draft.record_id,
                    error = %err,
                    "audit write failed; entry lost"
                );
                false
            }
        }
    }

    /// Appends one entry per changed field. Returns how many landed.
    pub async fn record_field_changes(
        &self,
        actor: Option<&SessionContext>,
        client: &ClientContext,
        action_type: ActionType,
        table_name: &str,
        record_id: &str,
        changes: &[FieldChange],
    ) -> usize {
        let mut recorded = 0;
        for change in changes {
            let draft = AuditEntryDraft::new(actor, client, action_type, table_name, record_id)
                .field(change.field.clone())
                .values(change.old_value.clone(), change.new_value.clone());
            if self.record(draft).await {
                recorded += 1;
            }
        }
        recorded
    }

    /// Trail browsing, newest first.
    #[instrument(skip(self))]
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, ServiceError> {
        let mut filters = Vec::new();
        if let Some(table) = &query.table_name {
            filters.push(Filter::eq("table_name", table.clone()));
        }
        if let Some(record_id) = &query.record_id {
            filters.push(Filter::eq("record_id", record_id.clone()));
        }
        if let Some(action) = &query.action_type {
            filters.push(Filter::eq("action_type", action.to_string()));
        }
        if let Some(user_id) = &query.user_id {
            filters.push(Filter::eq("user_id", user_id.clone()));
        }
        let opts =
            QueryOptions::newest_first("timestamp", query.limit.unwrap_or(DEFAULT_QUERY_LIMIT));

        let rows = self.store.query(collections::AUDIT_LOGS, &filters, &opts).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<AuditLogEntry>(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(error = %err, "skipping malformed audit row"),
            }
        }
        Ok(entries)
    }
}
