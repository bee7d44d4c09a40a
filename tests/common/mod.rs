//! Shared fixtures for the integration suites: an in-memory backed
//! service graph, row seeding helpers, and a store double that fails
//! writes to chosen collections.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use labstock_api::errors::StoreError;
use labstock_api::handlers::AppServices;
use labstock_api::models::{ClientContext, Role, SessionContext};
use labstock_api::store::{collections, Filter, InMemoryStore, QueryOptions, RecordStore};

pub const DEFAULT_REORDER_LEVEL: i64 = 50;
pub const DECREMENT_MAX_RETRIES: u32 = 3;

// Cheap hashing rounds for seeded accounts.
const TEST_COST: u32 = 4;

/// Service graph over a fresh in-memory store; the store handle stays
/// available for direct row inspection.
pub fn services() -> (Arc<InMemoryStore>, AppServices) {
    let store = Arc::new(InMemoryStore::new());
    let services = AppServices::new(
        store.clone(),
        DEFAULT_REORDER_LEVEL,
        DECREMENT_MAX_RETRIES,
    );
    (store, services)
}

/// Service graph over an arbitrary store implementation.
pub fn services_over(store: Arc<dyn RecordStore>) -> AppServices {
    AppServices::new(store, DEFAULT_REORDER_LEVEL, DECREMENT_MAX_RETRIES)
}

pub fn seed_item(store: &InMemoryStore, item_id: &str, item_name: &str, quantity: i64) {
    store.seed(
        collections::INVENTORY,
        json!({
            "item_id": item_id,
            "item_name": item_name,
            "category": "PPE",
            "quantity": quantity,
            "unit": "Units",
            "storage_location": "Main Store",
            "supplier": "Standard Supplier",
            "expiry_date": null,
            "reorder_level": DEFAULT_REORDER_LEVEL,
            "notes": "",
            "status": "Active",
            "last_updated": null,
        }),
    );
}

pub fn seed_user(store: &InMemoryStore, username: &str, password: &str, role: &str) {
    let hash = bcrypt::hash(password, TEST_COST).unwrap();
    store.seed(
        collections::USERS,
        json!({
            "username": username,
            "password_hash": hash,
            "full_name": format!("{} Person", username),
            "role": role,
            "department": "Biomedical",
            "email": null,
        }),
    );
}

pub fn admin_actor() -> SessionContext {
    SessionContext {
        username: "boss".to_string(),
        full_name: "Boss Person".to_string(),
        role: Role::Admin,
        department: "Biomedical".to_string(),
    }
}

pub fn user_actor(username: &str) -> SessionContext {
    SessionContext {
        username: username.to_string(),
        full_name: format!("{} Person", username),
        role: Role::User,
        department: "Biomedical".to_string(),
    }
}

pub fn client() -> ClientContext {
    ClientContext {
        ip_address: "10.0.0.5".to_string(),
        user_agent: "integration-test".to_string(),
    }
}

/// All audit rows for one collection/record pair, unordered.
pub async fn audit_rows(store: &InMemoryStore, table: &str, record_id: &str) -> Vec<Value> {
    store
        .query(
            collections::AUDIT_LOGS,
            &[
                Filter::eq("table_name", table),
                Filter::eq("record_id", record_id),
            ],
            &QueryOptions::default(),
        )
        .await
        .unwrap()
}

/// Store double that delegates to an in-memory store but rejects every
/// write to the named collections. Reads always pass through.
pub struct FailingStore {
    inner: InMemoryStore,
    fail_writes: HashSet<String>,
}

impl FailingStore {
    pub fn failing_writes(collections: &[&str]) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_writes: collections.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self, collection: &str) -> Result<(), StoreError> {
        if self.fail_writes.contains(collection) {
            Err(StoreError::Rejected {
                status: 503,
                body: format!("writes to {} are disabled", collection),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        opts: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.query(collection, filters, opts).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Vec<Value>, StoreError> {
        self.check(collection)?;
        self.inner.insert(collection, record).await
    }

    async fn update(
        &self,
        collection: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.check(collection)?;
        self.inner.update(collection, filters, patch).await
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        self.check(collection)?;
        self.inner.delete(collection, filters).await
    }
}

/// Store double where conditional inventory writes lose to a phantom
/// concurrent writer: the first `losses` updates to the inventory
/// collection match nothing and return an empty row set without
/// applying. Attempts are counted so tests can assert how many rounds
/// the caller took.
pub struct ContendedStore {
    inner: InMemoryStore,
    remaining_losses: AtomicU32,
    update_attempts: AtomicU32,
}

impl ContendedStore {
    pub fn losing_updates(losses: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            remaining_losses: AtomicU32::new(losses),
            update_attempts: AtomicU32::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn update_attempts(&self) -> u32 {
        self.update_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for ContendedStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        opts: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.query(collection, filters, opts).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Vec<Value>, StoreError> {
        self.inner.insert(collection, record).await
    }

    async fn update(
        &self,
        collection: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        if collection == collections::INVENTORY {
            self.update_attempts.fetch_add(1, Ordering::SeqCst);
            let lost = self
                .remaining_losses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lost {
                return Ok(Vec::new());
            }
        }
        self.inner.update(collection, filters, patch).await
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        self.inner.delete(collection, filters).await
    }
}
