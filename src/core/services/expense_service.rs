use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AuditAction, AuditEntry, Expense, ExpenseBook, ExpenseChanges, ExpenseDraft, HakEdisPolicy, OverrideState, Reminder,
    ReminderKind, Severity, UnknownVariant, WorkScopeLevel,
};
use crate::engine::{
    validate, CommissionEngine, Decision, DecisionReason, DocumentationPolicy,
    DocumentationRequirement,
};

use super::{OverrideService, Role, ServiceResult};
use crate::core::errors::CrmError;

/// What happened when an expense was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseOutcome {
    pub expense_id: Uuid,
    pub decision: Decision,
    pub documentation: DocumentationRequirement,
}

pub struct ExpenseService;

impl ExpenseService {
    /// Validates, classifies and stores a new expense, raising reminders for missing
    /// paperwork and pending approvals.
    pub fn create(
        book: &mut ExpenseBook,
        draft: ExpenseDraft,
        engine: &CommissionEngine,
        docs: &DocumentationPolicy,
    ) -> ServiceResult<ExpenseOutcome> {
        let mut expense = Self::build(book, &draft)?;
        let vendor = expense.vendor_id.and_then(|id| book.vendor(id));
        let documentation = docs.check(
            expense.work_scope_level,
            &expense.primary_tag,
            &expense.vendor_name,
            vendor,
        );

        let decision = engine.decide_expense(&expense, OverrideState::None);
        Self::ensure_decided(&decision)?;
        expense.apply_outcome(decision.is_eligible, decision.hak_edis_amount);
        let audit = AuditEntry::new(AuditAction::CreateExpense, expense.id).after(&expense);
        let expense_id = book.add_expense(expense);
        book.record_audit(audit);

        if documentation.required {
            book.add_reminder(Reminder::new(
                ReminderKind::MissingDocument,
                Severity::High,
                "Documentation Required",
                documentation.reason.clone().unwrap_or_default(),
                Some(expense_id),
            ));
        }
        if decision.requires_approval {
            book.add_reminder(Reminder::new(
                ReminderKind::ConditionalPending,
                Severity::Medium,
                "Conditional Hak Ediş Pending",
                format!(
                    "Expense requires owner approval for hak ediş. Potential: {:.2}",
                    decision.potential_amount.unwrap_or_default()
                ),
                Some(expense_id),
            ));
        }

        tracing::info!(
            %expense_id,
            reason = %decision.reason,
            amount = decision.hak_edis_amount,
            "expense recorded"
        );
        Ok(ExpenseOutcome {
            expense_id,
            decision,
            documentation,
        })
    }

    /// Runs the decision table on unsaved input.
    pub fn preview(
        draft: &ExpenseDraft,
        override_state: OverrideState,
        engine: &CommissionEngine,
    ) -> Decision {
        engine.decide_draft(draft, override_state)
    }

    /// Merges changes into a stored expense and recomputes its hak ediş with the live
    /// override state. A pending override request is closed when the expense no longer
    /// accepts one.
    pub fn update(
        book: &mut ExpenseBook,
        id: Uuid,
        changes: ExpenseChanges,
        role: Role,
        engine: &CommissionEngine,
    ) -> ServiceResult<Decision> {
        let existing = book
            .expense(id)
            .ok_or_else(|| CrmError::not_found("Expense", id))?;

        if changes.hak_edis_rate.is_some() {
            if role == Role::Operation {
                tracing::warn!(%id, "operation user attempted to change the hak ediş rate");
                return Err(CrmError::Forbidden(
                    "Operation users cannot modify hak ediş rate".into(),
                ));
            }
            tracing::warn!(%id, "per-expense rate ignored; the rate is system-wide");
        }

        let draft = changes.merge_into(existing);
        let mut updated = Self::build(book, &draft)?;
        updated.id = existing.id;
        updated.override_id = existing.override_id;
        let audit = AuditEntry::new(AuditAction::UpdateExpense, id)
            .by(role)
            .before(existing);

        if !updated.accepts_override() {
            let notes = format!(
                "Cancelled: expense reclassified as {} + {}",
                updated.work_scope_level, updated.hak_edis_policy
            );
            if OverrideService::cancel_pending(book, id, &notes).is_some() {
                updated.override_id = book.approved_override(id).map(|record| record.id);
            }
        }

        let decision = engine.decide_expense(
            &updated,
            OverrideState::from_record(book.active_override(id)),
        );
        Self::ensure_decided(&decision)?;
        updated.apply_outcome(decision.is_eligible, decision.hak_edis_amount);

        let audit = audit.after(&updated);
        if let Some(slot) = book.expense_mut(id) {
            *slot = updated;
        }
        book.record_audit(audit);
        book.touch();
        tracing::info!(%id, reason = %decision.reason, "expense updated");
        Ok(decision)
    }

    /// Refreshes the derived fields of one expense from the engine.
    pub fn recompute(
        book: &mut ExpenseBook,
        id: Uuid,
        engine: &CommissionEngine,
    ) -> ServiceResult<Decision> {
        let state = OverrideState::from_record(book.active_override(id));
        let expense = book
            .expense_mut(id)
            .ok_or_else(|| CrmError::not_found("Expense", id))?;
        let decision = engine.decide_expense(expense, state);
        expense.apply_outcome(decision.is_eligible, decision.hak_edis_amount);
        book.touch();
        Ok(decision)
    }

    /// Refreshes every expense, e.g. after the configured rate changed. Returns how many
    /// stored amounts changed. Pending override requests are revalued too.
    pub fn recompute_all(book: &mut ExpenseBook, engine: &CommissionEngine) -> usize {
        let amounts: Vec<(Uuid, f64)> = book
            .expenses
            .iter()
            .map(|expense| (expense.id, engine.commission(expense.amount)))
            .collect();
        for record in book.overrides.iter_mut().filter(|record| record.is_pending()) {
            if let Some((_, potential)) = amounts.iter().find(|(id, _)| *id == record.expense_id) {
                record.requested_hak_edis_amount = *potential;
            }
        }

        let overrides = book.overrides_map();
        let mut changed = 0;
        for entry in engine.calculate_batch(&book.expenses, &overrides) {
            if let Some(expense) = book.expense_mut(entry.expense_id) {
                let before = (expense.is_hak_edis_eligible, expense.hak_edis_amount);
                expense.apply_outcome(entry.decision.is_eligible, entry.decision.hak_edis_amount);
                if before != (expense.is_hak_edis_eligible, expense.hak_edis_amount) {
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            book.touch();
            tracing::info!(changed, "recomputed hak ediş");
        }
        changed
    }

    /// Deletes an expense together with its overrides and reminders.
    pub fn remove(book: &mut ExpenseBook, id: Uuid) -> ServiceResult<()> {
        let index = book
            .expenses
            .iter()
            .position(|expense| expense.id == id)
            .ok_or_else(|| CrmError::not_found("Expense", id))?;
        let removed = book.expenses.remove(index);
        book.overrides.retain(|record| record.expense_id != id);
        book.reminders.retain(|reminder| reminder.expense_id != Some(id));
        book.record_audit(AuditEntry::new(AuditAction::DeleteExpense, id).before(&removed));
        book.touch();
        tracing::info!(%id, "expense removed");
        Ok(())
    }

    pub fn list(book: &ExpenseBook) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = book.expenses.iter().collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        expenses
    }

    fn build(book: &ExpenseBook, draft: &ExpenseDraft) -> ServiceResult<Expense> {
        let mut report = validate(draft);

        let vendor = match draft.vendor_id {
            Some(id) => Some(
                book.vendor(id)
                    .ok_or_else(|| CrmError::not_found("Vendor", id))?,
            ),
            None => None,
        };
        let vendor_name = ExpenseDraft::text(&draft.vendor_name)
            .map(str::to_string)
            .or_else(|| vendor.map(|v| v.name.clone()));
        if vendor_name.is_none() {
            report.errors.push("vendor_name is required".to_string());
        }

        if !report.errors.is_empty() {
            tracing::warn!(errors = ?report.errors, "expense rejected");
            return Err(CrmError::Validation(report.errors));
        }

        let scope = parse_field(&draft.work_scope_level, WorkScopeLevel::parse_exact)?;
        let policy = parse_field(&draft.hak_edis_policy, HakEdisPolicy::parse_exact)?;
        let mut expense = Expense::new(
            draft.date.unwrap_or_else(|| Utc::now().date_naive()),
            vendor_name.unwrap_or_default(),
            draft.amount.unwrap_or_default(),
            ExpenseDraft::text(&draft.primary_tag).unwrap_or_default(),
            scope,
            policy,
        );
        expense.vendor_id = vendor.map(|v| v.id);
        if let Some(currency) = ExpenseDraft::text(&draft.currency) {
            expense.currency = currency.to_ascii_uppercase();
        }
        expense.description = ExpenseDraft::text(&draft.description).map(str::to_string);
        Ok(expense)
    }

    /// `UNKNOWN_CONFIGURATION` is a logic bug and aborts the operation.
    fn ensure_decided(decision: &Decision) -> ServiceResult<()> {
        if decision.reason == DecisionReason::UnknownConfiguration {
            tracing::error!(details = %decision.details, "hak ediş decision table fell through");
            return Err(CrmError::Configuration(decision.details.clone()));
        }
        if decision.reason.is_input_error() {
            return Err(CrmError::Validation(vec![decision
                .error
                .clone()
                .unwrap_or_else(|| decision.reason.to_string())]));
        }
        Ok(())
    }
}

fn parse_field<T>(
    raw: &Option<String>,
    parse: fn(&str) -> Result<T, UnknownVariant>,
) -> ServiceResult<T> {
    let text = ExpenseDraft::text(raw).unwrap_or_default();
    parse(text).map_err(|err| CrmError::Validation(vec![err.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vendor;

    fn draft(amount: f64, tag: &str, scope: &str, policy: &str) -> ExpenseDraft {
        ExpenseDraft::new(amount, tag)
            .scope(scope)
            .policy(policy)
            .vendor("Tersane Usta")
    }

    #[test]
    fn create_persists_decision_and_reminders() {
        let mut book = ExpenseBook::new("Create");
        let engine = CommissionEngine::default();
        let outcome = ExpenseService::create(
            &mut book,
            draft(2000.0, "CAM", "MALZEME_PLUS_IMALAT", "CONDITIONAL"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .expect("create expense");

        let stored = book.expense(outcome.expense_id).unwrap();
        assert!(!stored.is_hak_edis_eligible);
        assert_eq!(stored.hak_edis_amount, 0.0);
        assert_eq!(outcome.decision.potential_amount, Some(140.0));
        assert!(!outcome.documentation.required);
        assert_eq!(book.reminders.len(), 1);
        assert_eq!(book.reminders[0].kind, ReminderKind::ConditionalPending);
    }

    #[test]
    fn create_rejects_invalid_draft_with_all_errors() {
        let mut book = ExpenseBook::new("Invalid");
        let err = ExpenseService::create(
            &mut book,
            ExpenseDraft::default(),
            &CommissionEngine::default(),
            &DocumentationPolicy::default(),
        )
        .unwrap_err();
        match err {
            CrmError::Validation(errors) => assert_eq!(errors.len(), 5),
            other => panic!("unexpected error: {other}"),
        }
        assert!(book.expenses.is_empty());
    }

    #[test]
    fn create_uses_vendor_record_for_documentation() {
        let mut book = ExpenseBook::new("Docs");
        let vendor_id = book.add_vendor(Vendor::new("Baran Marin"));
        let mut input = ExpenseDraft::new(800.0, "MONTAJ")
            .scope("PURE_IMALAT")
            .policy("ALWAYS_INCLUDED");
        input.vendor_id = Some(vendor_id);

        let outcome = ExpenseService::create(
            &mut book,
            input,
            &CommissionEngine::default(),
            &DocumentationPolicy::default(),
        )
        .unwrap();
        assert!(outcome.documentation.required);
        let stored = book.expense(outcome.expense_id).unwrap();
        assert_eq!(stored.vendor_name, "Baran Marin");
        assert_eq!(stored.hak_edis_amount, 56.0);
        assert_eq!(book.reminders[0].kind, ReminderKind::MissingDocument);
    }

    #[test]
    fn operation_role_cannot_change_rate() {
        let mut book = ExpenseBook::new("Rate");
        let engine = CommissionEngine::default();
        let outcome = ExpenseService::create(
            &mut book,
            draft(1000.0, "KAYNAK", "PURE_IMALAT", "ALWAYS_INCLUDED"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .unwrap();
        let changes = ExpenseChanges {
            hak_edis_rate: Some(0.1),
            ..ExpenseChanges::default()
        };
        let err = ExpenseService::update(
            &mut book,
            outcome.expense_id,
            changes,
            Role::Operation,
            &engine,
        )
        .unwrap_err();
        assert!(matches!(err, CrmError::Forbidden(_)));
    }

    #[test]
    fn update_recomputes_on_scope_change() {
        let mut book = ExpenseBook::new("Update");
        let engine = CommissionEngine::default();
        let outcome = ExpenseService::create(
            &mut book,
            draft(1000.0, "KAYNAK", "PURE_IMALAT", "ALWAYS_INCLUDED"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .unwrap();
        let changes = ExpenseChanges {
            work_scope_level: Some("PURE_MALZEME".into()),
            ..ExpenseChanges::default()
        };
        let decision =
            ExpenseService::update(&mut book, outcome.expense_id, changes, Role::Owner, &engine)
                .unwrap();
        assert_eq!(decision.reason, DecisionReason::WorkScopeExcluded);
        let stored = book.expense(outcome.expense_id).unwrap();
        assert!(!stored.is_hak_edis_eligible);
        assert_eq!(stored.hak_edis_amount, 0.0);
        assert_eq!(stored.vendor_name, "Tersane Usta");
    }

    #[test]
    fn recompute_all_applies_new_rate() {
        let mut book = ExpenseBook::new("Recompute");
        let engine = CommissionEngine::default();
        ExpenseService::create(
            &mut book,
            draft(1000.0, "KAYNAK", "PURE_IMALAT", "ALWAYS_INCLUDED"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .unwrap();
        let changed = ExpenseService::recompute_all(&mut book, &CommissionEngine::new(0.1));
        assert_eq!(changed, 1);
        assert_eq!(book.expenses[0].hak_edis_amount, 100.0);
        assert_eq!(
            ExpenseService::recompute_all(&mut book, &CommissionEngine::new(0.1)),
            0
        );
    }

    #[test]
    fn remove_drops_related_records() {
        let mut book = ExpenseBook::new("Remove");
        let outcome = ExpenseService::create(
            &mut book,
            draft(100.0, "OFIS", "NON_IMALAT", "ALWAYS_EXCLUDED"),
            &CommissionEngine::default(),
            &DocumentationPolicy::default(),
        )
        .unwrap();
        assert_eq!(book.reminders.len(), 1);
        ExpenseService::remove(&mut book, outcome.expense_id).unwrap();
        assert!(book.expenses.is_empty());
        assert!(book.reminders.is_empty());
        let last = book.audit.last().unwrap();
        assert_eq!(last.action, AuditAction::DeleteExpense);
        assert_eq!(last.before.as_ref().unwrap()["primary_tag"], "OFIS");
        assert!(ExpenseService::remove(&mut book, outcome.expense_id).is_err());
    }

    #[test]
    fn reclassifying_closes_pending_override() {
        let mut book = ExpenseBook::new("Reclassify");
        let engine = CommissionEngine::default();
        let outcome = ExpenseService::create(
            &mut book,
            draft(2000.0, "CAM", "MALZEME_PLUS_IMALAT", "CONDITIONAL"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .unwrap();
        let override_id = OverrideService::request(
            &mut book,
            outcome.expense_id,
            "glass fitting is mostly labor",
            &engine,
        )
        .unwrap();

        let changes = ExpenseChanges {
            hak_edis_policy: Some("ALWAYS_EXCLUDED".into()),
            ..ExpenseChanges::default()
        };
        let decision =
            ExpenseService::update(&mut book, outcome.expense_id, changes, Role::Owner, &engine)
                .unwrap();
        assert_eq!(decision.reason, DecisionReason::PolicyAlwaysExcluded);

        let record = book.override_record(override_id).unwrap();
        assert!(!record.is_pending());
        let stored = book.expense(outcome.expense_id).unwrap();
        assert!(stored.override_id.is_none());
        assert!(!stored.is_hak_edis_eligible);
        assert!(book
            .open_reminders()
            .iter()
            .all(|r| r.kind != ReminderKind::OverridePending));
        let err = OverrideService::approve(&mut book, override_id, Role::Owner, None, &engine)
            .unwrap_err();
        assert_eq!(err.code(), Some("NOT_PENDING"));

        let update = book.audit.last().unwrap();
        assert_eq!(update.action, AuditAction::UpdateExpense);
        assert_eq!(update.before.as_ref().unwrap()["hak_edis_policy"], "CONDITIONAL");
        assert_eq!(update.after.as_ref().unwrap()["hak_edis_policy"], "ALWAYS_EXCLUDED");
    }

    #[test]
    fn recompute_all_revalues_pending_requests() {
        let mut book = ExpenseBook::new("Revalue");
        let engine = CommissionEngine::default();
        let outcome = ExpenseService::create(
            &mut book,
            draft(2000.0, "CAM", "MALZEME_PLUS_IMALAT", "CONDITIONAL"),
            &engine,
            &DocumentationPolicy::default(),
        )
        .unwrap();
        let override_id = OverrideService::request(
            &mut book,
            outcome.expense_id,
            "glass fitting is mostly labor",
            &engine,
        )
        .unwrap();

        ExpenseService::recompute_all(&mut book, &CommissionEngine::new(0.1));
        let record = book.override_record(override_id).unwrap();
        assert_eq!(record.requested_hak_edis_amount, 200.0);
    }
}
