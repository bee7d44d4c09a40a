//! HTTP glue over the service layer. Handlers translate between the wire
//! shapes and service calls; no business logic lives here.

use std::sync::Arc;

use crate::services::{AuditService, InventoryService, UsageService, UserService};
use crate::store::RecordStore;

pub mod audit;
pub mod auth;
pub mod common;
pub mod health;
pub mod inventory;
pub mod reports;
pub mod usage;
pub mod users;

pub use common::Actor;

/// Service handles shared by all handlers.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn RecordStore>,
    pub audit: Arc<AuditService>,
    pub inventory: Arc<InventoryService>,
    pub usage: Arc<UsageService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    /// Wires the full service graph over one store backend.
    pub fn new(
        store: Arc<dyn RecordStore>,
        default_reorder_level: i64,
        decrement_max_retries: u32,
    ) -> Self {
        let audit = Arc::new(AuditService::new(store.clone()));
        let inventory = Arc::new(InventoryService::new(
            store.clone(),
            audit.clone(),
            default_reorder_level,
            decrement_max_retries,
        ));
        let usage = Arc::new(UsageService::new(
            store.clone(),
            inventory.clone(),
            audit.clone(),
        ));
        let users = Arc::new(UserService::new(store.clone(), audit.clone()));
        Self {
            store,
            audit,
            inventory,
            usage,
            users,
        }
    }
}
