pub mod audit;
pub mod inventory;
pub mod usage;
pub mod users;

pub use audit::{AuditEntryDraft, AuditQuery, AuditService};
pub use inventory::InventoryService;
pub use usage::{UsageReceipt, UsageService};
pub use users::UserService;
