use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use super::audit::FieldChange;
use super::session::Role;

/// Full stored user row, hash included. Internal to the user service; the
/// outward-facing shape is [`UserProfile`].
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// User shape returned to callers; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub department: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            department: user.department,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Input for creating an account. Plaintext password here only; it is
/// hashed before anything is written. No Debug derive, so the password
/// cannot reach a log line by accident.
#[derive(Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "full_name is required"))]
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewUser {
    pub fn into_record(self, password_hash: String) -> Value {
        let now = Utc::now().to_rfc3339();
        json!({
            "username": self.username,
            "password_hash": password_hash,
            "full_name": self.full_name,
            "role": self.role,
            "department": self.department,
            "email": self.email,
            "created_at": now,
            "updated_at": now,
        })
    }
}

/// Self-service password rotation; the caller proves knowledge of the
/// current password. Two plaintexts in flight, so no Debug derive here
/// either.
#[derive(Clone, Deserialize, Validate)]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub new_password: String,
}

/// Partial account update. A present `password` requests a reset and is
/// hashed by the service before storage.
#[derive(Clone, Default, Deserialize)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Placeholder recorded in audit rows instead of credential material.
pub const REDACTED: &str = "[redacted]";

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.role.is_none()
            && self.department.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }

    /// Field-level diff. Password resets appear as a change with both
    /// values redacted; the hash never reaches the audit trail.
    pub fn diff_against(&self, current: &User) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        let mut push = |field: &str, old: String, new: String| {
            if old != new {
                changes.push(FieldChange {
                    field: field.to_string(),
                    old_value: old,
                    new_value: new,
                });
            }
        };

        if let Some(name) = &self.full_name {
            push("full_name", current.full_name.clone(), name.clone());
        }
        if let Some(role) = self.role {
            push("role", current.role.to_string(), role.to_string());
        }
        if let Some(department) = &self.department {
            push("department", current.department.clone(), department.clone());
        }
        if let Some(email) = &self.email {
            push(
                "email",
                current.email.clone().unwrap_or_default(),
                email.clone(),
            );
        }
        if self.password.is_some() {
            changes.push(FieldChange {
                field: "password".to_string(),
                old_value: REDACTED.to_string(),
                new_value: REDACTED.to_string(),
            });
        }
        changes
    }

    /// Store patch for the changed fields; the password arrives separately
    /// as an already-computed hash.
    pub fn to_store_patch(
        &self,
        changes: &[FieldChange],
        password_hash: Option<String>,
    ) -> Value {
        let changed: std::collections::HashSet<&str> =
            changes.iter().map(|c| c.field.as_str()).collect();
        let mut patch = Map::new();
        if changed.contains("full_name") {
            patch.insert("full_name".into(), json!(self.full_name));
        }
        if changed.contains("role") {
            patch.insert("role".into(), json!(self.role));
        }
        if changed.contains("department") {
            patch.insert("department".into(), json!(self.department));
        }
        if changed.contains("email") {
            patch.insert("email".into(), json!(self.email));
        }
        if let Some(hash) = password_hash {
            patch.insert("password_hash".into(), json!(hash));
        }
        patch.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
        Value::Object(patch)
    }
}
