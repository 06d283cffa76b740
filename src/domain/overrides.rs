//! Owner approval records for CONDITIONAL expenses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideStatus {
    Pending,
    Approved,
    Rejected,
}

impl OverrideStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OverrideStatus::Pending => "pending",
            OverrideStatus::Approved => "approved",
            OverrideStatus::Rejected => "rejected",
        }
    }
}

/// A request to flip a CONDITIONAL expense to eligible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideRecord {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub status: OverrideStatus,
    pub original_is_eligible: bool,
    pub original_hak_edis_amount: f64,
    pub requested_is_eligible: bool,
    pub requested_hak_edis_amount: f64,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

impl OverrideRecord {
    pub fn pending(expense_id: Uuid, reason: impl Into<String>, requested_amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            status: OverrideStatus::Pending,
            original_is_eligible: false,
            original_hak_edis_amount: 0.0,
            requested_is_eligible: true,
            requested_hak_edis_amount: requested_amount,
            reason: reason.into(),
            requested_at: Utc::now(),
            resolved_at: None,
            resolution_notes: None,
        }
    }

    pub fn approved(expense_id: Uuid, requested_is_eligible: bool) -> Self {
        let mut record = Self::pending(expense_id, "approved by owner", 0.0);
        record.requested_is_eligible = requested_is_eligible;
        record.resolve(OverrideStatus::Approved, None);
        record
    }

    pub fn is_pending(&self) -> bool {
        self.status == OverrideStatus::Pending
    }

    pub fn resolve(&mut self, status: OverrideStatus, notes: Option<String>) {
        self.status = status;
        self.resolved_at = Some(Utc::now());
        self.resolution_notes = notes;
    }
}

impl Identifiable for OverrideRecord {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Override state as seen by the commission engine.
///
/// Distinguishes "no request exists" from "a request exists but grants nothing yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideState {
    #[default]
    None,
    Pending,
    Rejected,
    Approved { eligibility: bool },
}

impl OverrideState {
    pub fn from_record(record: Option<&OverrideRecord>) -> Self {
        match record {
            None => OverrideState::None,
            Some(record) => match record.status {
                OverrideStatus::Pending => OverrideState::Pending,
                OverrideStatus::Rejected => OverrideState::Rejected,
                OverrideStatus::Approved => OverrideState::Approved {
                    eligibility: record.requested_is_eligible,
                },
            },
        }
    }

    /// True only for an approved override that asks for eligibility.
    pub fn grants_eligibility(&self) -> bool {
        matches!(self, OverrideState::Approved { eligibility: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_approved_records_grant_eligibility() {
        let expense_id = Uuid::new_v4();
        let mut record = OverrideRecord::pending(expense_id, "installation labor dominates", 70.0);
        assert_eq!(
            OverrideState::from_record(Some(&record)),
            OverrideState::Pending
        );
        assert!(!OverrideState::from_record(Some(&record)).grants_eligibility());

        record.resolve(OverrideStatus::Approved, None);
        assert!(OverrideState::from_record(Some(&record)).grants_eligibility());

        record.requested_is_eligible = false;
        assert!(!OverrideState::from_record(Some(&record)).grants_eligibility());
        assert!(!OverrideState::from_record(None).grants_eligibility());
    }
}
