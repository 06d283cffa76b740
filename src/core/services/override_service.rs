//! Owner approval workflow for CONDITIONAL expenses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::CrmError;
use crate::domain::{
    AuditAction, AuditEntry, ExpenseBook, OverrideRecord, OverrideStatus, Reminder,
    ReminderKind, Severity,
};
use crate::engine::{round2, CommissionEngine, Decision};

use super::{ExpenseService, Role, ServiceResult};

pub const MIN_REASON_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOverrides {
    pub overrides: Vec<OverrideRecord>,
    pub count: usize,
    pub total_potential_exposure: f64,
}

pub struct OverrideService;

impl OverrideService {
    /// Opens an approval request for a MALZEME_PLUS_IMALAT + CONDITIONAL expense.
    pub fn request(
        book: &mut ExpenseBook,
        expense_id: Uuid,
        reason: &str,
        engine: &CommissionEngine,
    ) -> ServiceResult<Uuid> {
        let reason = reason.trim();
        if reason.chars().count() < MIN_REASON_LEN {
            return Err(CrmError::Validation(vec![format!(
                "reason must be at least {MIN_REASON_LEN} characters"
            )]));
        }

        let expense = book
            .expense(expense_id)
            .ok_or_else(|| CrmError::not_found("Expense", expense_id))?;
        if !expense.accepts_override() {
            return Err(not_conditional());
        }
        if book.approved_override(expense_id).is_some() {
            return Err(CrmError::invalid_state(
                "ALREADY_APPROVED",
                "An approved override already governs this expense",
            ));
        }
        if book.pending_override(expense_id).is_some() {
            return Err(CrmError::invalid_state(
                "OVERRIDE_EXISTS",
                "Pending override request already exists for this expense",
            ));
        }

        let potential = engine.commission(expense.amount);
        let mut record = OverrideRecord::pending(expense_id, reason, potential);
        record.original_is_eligible = expense.is_hak_edis_eligible;
        record.original_hak_edis_amount = expense.hak_edis_amount;
        let message = format!(
            "Override request for {}: {:.2} {} hak ediş. Reason: {}",
            expense.vendor_name, potential, expense.currency, reason
        );

        let audit = AuditEntry::new(AuditAction::CreateOverride, record.id).after(&record);
        let override_id = book.add_override(record);
        if let Some(expense) = book.expense_mut(expense_id) {
            expense.override_id = Some(override_id);
        }
        book.resolve_reminders(expense_id, ReminderKind::ConditionalPending);
        book.add_reminder(Reminder::new(
            ReminderKind::OverridePending,
            Severity::High,
            "Hak Ediş Override Pending Approval",
            message,
            Some(expense_id),
        ));
        book.record_audit(audit);

        tracing::info!(%override_id, %expense_id, potential, "override requested");
        Ok(override_id)
    }

    /// Approves a pending request and recomputes the expense through the engine.
    pub fn approve(
        book: &mut ExpenseBook,
        override_id: Uuid,
        role: Role,
        notes: Option<String>,
        engine: &CommissionEngine,
    ) -> ServiceResult<Decision> {
        role.require_owner("approve overrides")?;
        let expense_id = Self::take_pending(book, override_id)?;
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Self::resolve(
            book,
            override_id,
            OverrideStatus::Approved,
            notes,
            AuditEntry::new(AuditAction::ApproveOverride, override_id).by(role),
        );
        let decision = ExpenseService::recompute(book, expense_id, engine)?;
        book.resolve_reminders(expense_id, ReminderKind::OverridePending);

        tracing::info!(
            %override_id,
            %expense_id,
            amount = decision.hak_edis_amount,
            "override approved"
        );
        Ok(decision)
    }

    /// Rejects a pending request; the expense stays excluded.
    pub fn reject(
        book: &mut ExpenseBook,
        override_id: Uuid,
        role: Role,
        notes: &str,
        engine: &CommissionEngine,
    ) -> ServiceResult<()> {
        role.require_owner("reject overrides")?;
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(CrmError::Validation(vec![
                "Rejection reason is required".to_string()
            ]));
        }
        let expense_id = Self::take_pending(book, override_id)?;

        Self::resolve(
            book,
            override_id,
            OverrideStatus::Rejected,
            Some(notes.to_string()),
            AuditEntry::new(AuditAction::RejectOverride, override_id).by(role),
        );
        Self::relink(book, expense_id);
        ExpenseService::recompute(book, expense_id, engine)?;
        book.resolve_reminders(expense_id, ReminderKind::OverridePending);
        book.add_reminder(Reminder::new(
            ReminderKind::OverrideRejected,
            Severity::Low,
            "Hak Ediş Override Rejected",
            notes,
            Some(expense_id),
        ));

        tracing::info!(%override_id, %expense_id, "override rejected");
        Ok(())
    }

    /// Closes the pending request of an expense that no longer accepts overrides.
    /// Returns the closed request, if there was one.
    pub fn cancel_pending(
        book: &mut ExpenseBook,
        expense_id: Uuid,
        notes: &str,
    ) -> Option<Uuid> {
        let override_id = book.pending_override(expense_id)?.id;
        Self::resolve(
            book,
            override_id,
            OverrideStatus::Rejected,
            Some(notes.to_string()),
            AuditEntry::new(AuditAction::CancelOverride, override_id),
        );
        Self::relink(book, expense_id);
        book.resolve_reminders(expense_id, ReminderKind::OverridePending);
        tracing::info!(%override_id, %expense_id, "pending override cancelled");
        Some(override_id)
    }

    /// Pending requests, oldest first, valued at the current amount and rate.
    pub fn pending(book: &ExpenseBook, engine: &CommissionEngine) -> PendingOverrides {
        let mut overrides: Vec<OverrideRecord> = book
            .overrides
            .iter()
            .filter(|record| record.is_pending())
            .filter_map(|record| {
                let expense = book.expense(record.expense_id)?;
                let mut record = record.clone();
                record.requested_hak_edis_amount = engine.commission(expense.amount);
                Some(record)
            })
            .collect();
        overrides.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        let total: f64 = overrides
            .iter()
            .map(|record| record.requested_hak_edis_amount)
            .sum();
        PendingOverrides {
            count: overrides.len(),
            total_potential_exposure: round2(total),
            overrides,
        }
    }

    /// All requests, optionally filtered by status; pending first, then newest first.
    pub fn list(book: &ExpenseBook, status: Option<OverrideStatus>) -> Vec<&OverrideRecord> {
        let mut records: Vec<&OverrideRecord> = book
            .overrides
            .iter()
            .filter(|record| status.map_or(true, |s| record.status == s))
            .collect();
        records.sort_by(|a, b| {
            b.is_pending()
                .cmp(&a.is_pending())
                .then_with(|| b.requested_at.cmp(&a.requested_at))
        });
        records
    }

    fn take_pending(book: &ExpenseBook, override_id: Uuid) -> ServiceResult<Uuid> {
        let record = book
            .override_record(override_id)
            .ok_or_else(|| CrmError::not_found("Override request", override_id))?;
        if !record.is_pending() {
            return Err(CrmError::invalid_state(
                "NOT_PENDING",
                format!("Override is already {}", record.status.label()),
            ));
        }
        let expense = book
            .expense(record.expense_id)
            .ok_or_else(|| CrmError::not_found("Expense", record.expense_id))?;
        if !expense.accepts_override() {
            return Err(not_conditional());
        }
        Ok(record.expense_id)
    }

    fn resolve(
        book: &mut ExpenseBook,
        override_id: Uuid,
        status: OverrideStatus,
        notes: Option<String>,
        audit: AuditEntry,
    ) {
        let Some(record) = book.override_record_mut(override_id) else {
            return;
        };
        let audit = audit.before(&*record);
        record.resolve(status, notes);
        let audit = audit.after(&*record);
        book.record_audit(audit);
        book.touch();
    }

    /// Points the expense at the approved record still governing it, or at nothing.
    fn relink(book: &mut ExpenseBook, expense_id: Uuid) {
        let governing = book.approved_override(expense_id).map(|record| record.id);
        if let Some(expense) = book.expense_mut(expense_id) {
            expense.override_id = governing;
        }
    }
}

fn not_conditional() -> CrmError {
    CrmError::invalid_state(
        "NOT_CONDITIONAL",
        "Override requests are only for MALZEME_PLUS_IMALAT + CONDITIONAL expenses",
    )
}
