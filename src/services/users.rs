//! User administration and credential checks.
//!
//! Account management is admin-gated, and the acting session can never
//! edit or delete itself through these paths. Authentication deliberately
//! collapses "unknown user" and "wrong password" into the same `None`.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth;
use crate::errors::ServiceError;
use crate::models::user::REDACTED;
use crate::models::{
    ActionType, ClientContext, NewUser, PasswordChange, SessionContext, User, UserPatch,
    UserProfile,
};
use crate::services::audit::{AuditEntryDraft, AuditService};
use crate::store::{collections, Filter, QueryOptions, RecordStore};

/// The bootstrap account; protected from deletion so the system can never
/// lock every administrator out.
const BUILTIN_ADMIN: &str = "admin";

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore>,
    audit: Arc<AuditService>,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>, audit: Arc<AuditService>) -> Self {
        Self { store, audit }
    }

    async fn find(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let rows = self
            .store
            .query(
                collections::USERS,
                &[Filter::eq("username", username)],
                &QueryOptions::default(),
            )
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row).map_err(|e| {
                ServiceError::InternalError(format!("malformed user row: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    /// Checks credentials. Success emits a LOGIN audit entry attributed to
    /// the authenticated user; any failure returns `None` with no entry.
    #[instrument(skip(self, password, client))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &ClientContext,
    ) -> Result<Option<UserProfile>, ServiceError> {
        let Some(user) = self.find(username).await? else {
            return Ok(None);
        };
        if !auth::verify_password(password, &user.password_hash) {
            return Ok(None);
        }

        let actor = SessionContext {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            department: user.department.clone(),
        };
        info!(username = %user.username, "user authenticated");
        self.audit
            .record(AuditEntryDraft::new(
                Some(&actor),
                client,
                ActionType::Login,
                collections::USERS,
                &user.username,
            ))
            .await;
        Ok(Some(user.into()))
    }

    /// Records the end of a session. Audit-only; there is no server-side
    /// session state to tear down.
    #[instrument(skip(self, client))]
    pub async fn logout(&self, actor: &SessionContext, client: &ClientContext) {
        self.audit
            .record(AuditEntryDraft::new(
                Some(actor),
                client,
                ActionType::Logout,
                collections::USERS,
                &actor.username,
            ))
            .await;
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserProfile>, ServiceError> {
        let opts = QueryOptions {
            order_by: Some("username".to_string()),
            descending: false,
            limit: None,
        };
        let rows = self.store.query(collections::USERS, &[], &opts).await?;
        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<User>(row) {
                Ok(user) => profiles.push(user.into()),
                Err(err) => warn!(error = %err, "skipping malformed user row"),
            }
        }
        Ok(profiles)
    }

    /// Creates an account (admin only). Duplicate usernames are a
    /// conflict; the password is hashed before anything is written.
    #[instrument(skip(self, new_user, actor, client), fields(username = %new_user.username))]
    pub async fn create(
        &self,
        new_user: NewUser,
        actor: &SessionContext,
        client: &ClientContext,
    ) -> Result<UserProfile, ServiceError> {
        require_admin(actor)?;
        new_user
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if self.find(&new_user.username).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "username '{}' already exists",
                new_user.username
            )));
        }

        let username = new_user.username.clone();
        let password_hash = auth::hash_password(&new_user.password)?;
        let record = new_user.into_record(password_hash);
        let inserted = self.store.insert(collections::USERS, record).await?;
        let row = inserted.into_iter().next().ok_or_else(|| {
            ServiceError::InternalError(format!("store rejected user '{}'", username))
        })?;
        let user: User = serde_json::from_value(row)
            .map_err(|e| ServiceError::InternalError(format!("malformed user row: {}", e)))?;

        info!(username = %user.username, role = %user.role, "user created");
        self.audit
            .record(
                AuditEntryDraft::new(
                    Some(actor),
                    client,
                    ActionType::UserCreate,
                    collections::USERS,
                    &user.username,
                )
                .new_value(format!("{} ({})", user.full_name, user.role)),
            )
            .await;
        Ok(user.into())
    }

    /// Rotates the acting session's own password. Any account can call
    /// this, including the ones user administration refuses to touch; the
    /// current password must verify first. One USER_UPDATE audit entry
    /// with both values redacted.
    #[instrument(skip(self, change, actor, client), fields(username = %actor.username))]
    pub async fn change_password(
        &self,
        change: PasswordChange,
        actor: &SessionContext,
        client: &ClientContext,
    ) -> Result<(), ServiceError> {
        change
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let user = self
            .find(&actor.username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", actor.username)))?;
        if !auth::verify_password(&change.current_password, &user.password_hash) {
            return Err(ServiceError::AuthError(
                "current password does not match".to_string(),
            ));
        }

        let password_hash = auth::hash_password(&change.new_password)?;
        let updated = self
            .store
            .update(
                collections::USERS,
                &[Filter::eq("username", user.username.as_str())],
                json!({
                    "password_hash": password_hash,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "store rejected password change for user {}",
                user.username
            )));
        }

        info!(username = %user.username, "password changed");
        self.audit
            .record(
                AuditEntryDraft::new(
                    Some(actor),
                    client,
                    ActionType::UserUpdate,
                    collections::USERS,
                    &user.username,
                )
                .field("password")
                .values(REDACTED, REDACTED),
            )
            .await;
        Ok(())
    }

    /// Applies a partial account update (admin only, never to the acting
    /// session itself). One USER_UPDATE audit entry per changed field;
    /// password resets are recorded with redacted values.
    #[instrument(skip(self, patch, actor, client))]
    pub async fn update(
        &self,
        username: &str,
        patch: UserPatch,
        actor: &SessionContext,
        client: &ClientContext,
    ) -> Result<Vec<UserProfile>, ServiceError> {
        require_admin(actor)?;
        if actor.username == username {
            return Err(ServiceError::Forbidden(
                "accounts cannot edit themselves through user administration".to_string(),
            ));
        }
        if patch.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(password) = &patch.password {
            if password.len() < crate::models::user::MIN_PASSWORD_LEN {
                return Err(ServiceError::ValidationError(
                    "password must be at least 6 characters".to_string(),
                ));
            }
        }

        let current = self
            .find(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))?;

        let changes = patch.diff_against(&current);
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let password_hash = match &patch.password {
            Some(password) => Some(auth::hash_password(password)?),
            None => None,
        };
        let store_patch = patch.to_store_patch(&changes, password_hash);
        let updated = self
            .store
            .update(
                collections::USERS,
                &[Filter::eq("username", username)],
                store_patch,
            )
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "store rejected update of user {}",
                username
            )));
        }

        info!(username, changed_fields = changes.len(), "user updated");
        self.audit
            .record_field_changes(
                Some(actor),
                client,
                ActionType::UserUpdate,
                collections::USERS,
                username,
                &changes,
            )
            .await;

        let mut profiles = Vec::with_capacity(updated.len());
        for row in updated {
            if let Ok(user) = serde_json::from_value::<User>(row) {
                profiles.push(user.into());
            }
        }
        Ok(profiles)
    }

    /// Removes an account (admin only). The acting session and the
    /// built-in admin are off-limits. Historical usage and audit rows
    /// referencing the user are left untouched.
    #[instrument(skip(self, actor, client))]
    pub async fn delete(
        &self,
        username: &str,
        actor: &SessionContext,
        client: &ClientContext,
    ) -> Result<(), ServiceError> {
        require_admin(actor)?;
        if actor.username == username {
            return Err(ServiceError::Forbidden(
                "accounts cannot delete themselves".to_string(),
            ));
        }
        if username == BUILTIN_ADMIN {
            return Err(ServiceError::Forbidden(
                "the built-in admin account cannot be deleted".to_string(),
            ));
        }

        let removed = self
            .store
            .delete(collections::USERS, &[Filter::eq("username", username)])
            .await?;
        if removed.is_empty() {
            return Err(ServiceError::NotFound(format!("user {}", username)));
        }

        info!(username, "user deleted");
        self.audit
            .record(AuditEntryDraft::new(
                Some(actor),
                client,
                ActionType::UserDelete,
                collections::USERS,
                username,
            ))
            .await;
        Ok(())
    }
}

fn require_admin(actor: &SessionContext) -> Result<(), ServiceError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "user administration requires the admin role".to_string(),
        ))
    }
}
