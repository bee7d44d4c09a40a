//! Typed records for the four store collections plus the request-scoped
//! contexts (session actor, client attribution) passed into every mutating
//! operation.

pub mod audit;
pub mod inventory;
pub mod session;
pub mod usage;
pub mod user;

pub use audit::{ActionType, AuditLogEntry, FieldChange};
pub use inventory::{InventoryItem, InventoryPatch, ItemStatus, NewInventoryItem};
pub use session::{ClientContext, Role, SessionContext};
pub use usage::{NewUsageLog, UsageLogEntry};
pub use user::{NewUser, PasswordChange, User, UserPatch, UserProfile};
