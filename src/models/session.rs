use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Account role, lowest to highest privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Managers and admins both clear manager-level checks.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// The acting identity behind an operation. Always passed explicitly;
/// there is no ambient "current user" anywhere in the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub department: String,
}

impl SessionContext {
    /// Synthetic identity used to attribute audit entries when no actor is
    /// available (startup imports, unauthenticated probes).
    pub fn system() -> Self {
        Self {
            username: "system".to_string(),
            full_name: "System".to_string(),
            role: Role::User,
            department: "System".to_string(),
        }
    }
}

/// Best-effort caller attribution for the audit trail. Either field may be
/// unresolvable, in which case it reads "Unknown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            ip_address: "Unknown".to_string(),
            user_agent: "Unknown".to_string(),
        }
    }
}
