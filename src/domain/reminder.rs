use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    MissingDocument,
    ConditionalPending,
    OverridePending,
    OverrideRejected,
    ConfigurationError,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::MissingDocument => "MISSING_DOCUMENT",
            ReminderKind::ConditionalPending => "CONDITIONAL_PENDING",
            ReminderKind::OverridePending => "OVERRIDE_PENDING",
            ReminderKind::OverrideRejected => "OVERRIDE_REJECTED",
            ReminderKind::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// Follow-up item raised while recording expenses or handling overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: Uuid,
    pub kind: ReminderKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

impl Reminder {
    pub fn new(
        kind: ReminderKind,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        expense_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            title: title.into(),
            message: message.into(),
            expense_id,
            created_at: Utc::now(),
            resolved: false,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    pub fn resolve(&mut self) {
        self.resolved = true;
        self.resolved_at = Some(Utc::now());
    }

    pub fn resolve_with_notes(&mut self, notes: Option<String>) {
        self.resolve();
        self.resolution_notes = notes;
    }
}

impl Identifiable for Reminder {
    fn id(&self) -> Uuid {
        self.id
    }
}
