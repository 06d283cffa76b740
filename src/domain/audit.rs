//! Append-only trail of changes made to a book.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateExpense,
    UpdateExpense,
    DeleteExpense,
    CreateOverride,
    ApproveOverride,
    RejectOverride,
    CancelOverride,
    CreateVendor,
    UpdateVendor,
    DeleteVendor,
    ResolveReminder,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateExpense => "CREATE_EXPENSE",
            AuditAction::UpdateExpense => "UPDATE_EXPENSE",
            AuditAction::DeleteExpense => "DELETE_EXPENSE",
            AuditAction::CreateOverride => "CREATE_OVERRIDE",
            AuditAction::ApproveOverride => "APPROVE_OVERRIDE",
            AuditAction::RejectOverride => "REJECT_OVERRIDE",
            AuditAction::CancelOverride => "CANCEL_OVERRIDE",
            AuditAction::CreateVendor => "CREATE_VENDOR",
            AuditAction::UpdateVendor => "UPDATE_VENDOR",
            AuditAction::DeleteVendor => "DELETE_VENDOR",
            AuditAction::ResolveReminder => "RESOLVE_REMINDER",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded change. `before`/`after` hold JSON snapshots of the touched record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    pub entity_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, entity_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            action,
            entity_id,
            actor: None,
            before: None,
            after: None,
        }
    }

    pub fn by(mut self, actor: impl fmt::Display) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Snapshots that fail to serialize are dropped rather than failing the change.
    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.before = serde_json::to_value(value).ok();
        self
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.after = serde_json::to_value(value).ok();
        self
    }
}
