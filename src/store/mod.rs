//! Record-store access layer.
//!
//! Every collection the service touches (inventory, usage logs, audit logs,
//! users) lives in a remote record store reached through a filtered
//! query/insert/update/delete contract. Two backends implement it: a REST
//! client speaking PostgREST conventions and an in-memory store used by
//! tests and local development.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

pub mod memory;
pub mod rest;

pub use memory::InMemoryStore;
pub use rest::RestStore;

/// Logical collection names as they exist in the hosted store.
pub mod collections {
    pub const INVENTORY: &str = "inventory";
    pub const USAGE_LOGS: &str = "usage_logs";
    pub const AUDIT_LOGS: &str = "audit_logs";
    pub const USERS: &str = "users";
}

/// Comparison operator for a single filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gte,
    Lte,
    Like,
}

impl FilterOp {
    /// PostgREST operator token.
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
        }
    }
}

/// A single `field <op> value` predicate. Predicates in a filter list are
/// combined with AND semantics by every backend.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Neq, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }
}

/// Ordering and windowing for read queries.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn newest_first(field: impl Into<String>, limit: usize) -> Self {
        Self {
            order_by: Some(field.into()),
            descending: true,
            limit: Some(limit),
        }
    }
}

/// Filtered access to named collections.
///
/// All operations are single network round-trips. Mutations return the
/// affected rows; an empty vector from `insert`/`update`/`delete` means the
/// store did not apply the change (constraint violation, nothing matched),
/// and callers must treat it as failure.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        opts: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert(&self, collection: &str, record: Value) -> Result<Vec<Value>, StoreError>;

    async fn update(
        &self,
        collection: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError>;

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError>;
}
