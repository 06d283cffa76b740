use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    audit::AuditEntry,
    expense::Expense,
    overrides::{OverrideRecord, OverrideStatus},
    reminder::{Reminder, ReminderKind},
    vendor::Vendor,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// All records of one boat project: expenses, vendors, override requests and reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseBook {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "ExpenseBook::schema_version_default")]
    pub schema_version: u8,
}

impl ExpenseBook {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            expenses: Vec::new(),
            vendors: Vec::new(),
            overrides: Vec::new(),
            reminders: Vec::new(),
            audit: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_expense(&mut self, expense: Expense) -> Uuid {
        let id = expense.id;
        self.expenses.push(expense);
        self.touch();
        id
    }

    pub fn add_vendor(&mut self, vendor: Vendor) -> Uuid {
        let id = vendor.id;
        self.vendors.push(vendor);
        self.touch();
        id
    }

    pub fn add_override(&mut self, record: OverrideRecord) -> Uuid {
        let id = record.id;
        self.overrides.push(record);
        self.touch();
        id
    }

    pub fn add_reminder(&mut self, reminder: Reminder) -> Uuid {
        let id = reminder.id;
        self.reminders.push(reminder);
        self.touch();
        id
    }

    pub fn record_audit(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    /// Most recent audit entries first.
    pub fn audit_trail(&self, limit: usize) -> Vec<&AuditEntry> {
        self.audit.iter().rev().take(limit).collect()
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }

    pub fn expense_mut(&mut self, id: Uuid) -> Option<&mut Expense> {
        self.expenses.iter_mut().find(|expense| expense.id == id)
    }

    pub fn vendor(&self, id: Uuid) -> Option<&Vendor> {
        self.vendors.iter().find(|vendor| vendor.id == id)
    }

    pub fn vendor_mut(&mut self, id: Uuid) -> Option<&mut Vendor> {
        self.vendors.iter_mut().find(|vendor| vendor.id == id)
    }

    pub fn override_record(&self, id: Uuid) -> Option<&OverrideRecord> {
        self.overrides.iter().find(|record| record.id == id)
    }

    pub fn override_record_mut(&mut self, id: Uuid) -> Option<&mut OverrideRecord> {
        self.overrides.iter_mut().find(|record| record.id == id)
    }

    pub fn reminder(&self, id: Uuid) -> Option<&Reminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    pub fn reminder_mut(&mut self, id: Uuid) -> Option<&mut Reminder> {
        self.reminders.iter_mut().find(|reminder| reminder.id == id)
    }

    /// Resolves an id from its full form or an unambiguous prefix of its hyphenated form.
    pub fn resolve_id<'a, I>(ids: I, needle: &str) -> Option<Uuid>
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        let needle = needle.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        let mut found = None;
        for id in ids {
            if id.to_string().starts_with(&needle) {
                if found.is_some() {
                    return None;
                }
                found = Some(*id);
            }
        }
        found
    }

    /// The override that currently governs an expense.
    ///
    /// An approved record wins over later pending or rejected ones; otherwise the most
    /// recent request is returned.
    pub fn active_override(&self, expense_id: Uuid) -> Option<&OverrideRecord> {
        let mut latest: Option<&OverrideRecord> = None;
        for record in self.overrides.iter().filter(|r| r.expense_id == expense_id) {
            if record.status == OverrideStatus::Approved {
                return Some(record);
            }
            if latest.map_or(true, |current| record.requested_at >= current.requested_at) {
                latest = Some(record);
            }
        }
        latest
    }

    /// The approved record that grants eligibility, if any.
    pub fn approved_override(&self, expense_id: Uuid) -> Option<&OverrideRecord> {
        self.active_override(expense_id).filter(|record| {
            record.status == OverrideStatus::Approved && record.requested_is_eligible
        })
    }

    pub fn pending_override(&self, expense_id: Uuid) -> Option<&OverrideRecord> {
        self.overrides
            .iter()
            .find(|record| record.expense_id == expense_id && record.is_pending())
    }

    /// Governing override per expense, keyed by expense id.
    pub fn overrides_map(&self) -> HashMap<Uuid, OverrideRecord> {
        let mut map = HashMap::new();
        for expense in &self.expenses {
            if let Some(record) = self.active_override(expense.id) {
                map.insert(expense.id, record.clone());
            }
        }
        map
    }

    /// Marks open reminders of the given kind for an expense as resolved.
    pub fn resolve_reminders(&mut self, expense_id: Uuid, kind: ReminderKind) -> usize {
        let mut resolved = 0;
        for reminder in self
            .reminders
            .iter_mut()
            .filter(|r| !r.resolved && r.kind == kind && r.expense_id == Some(expense_id))
        {
            reminder.resolve();
            resolved += 1;
        }
        if resolved > 0 {
            self.touch();
        }
        resolved
    }

    pub fn open_reminders(&self) -> Vec<&Reminder> {
        let mut open: Vec<&Reminder> = self.reminders.iter().filter(|r| !r.resolved).collect();
        open.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        open
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        classification::{HakEdisPolicy, WorkScopeLevel},
        reminder::Severity,
    };
    use chrono::NaiveDate;

    fn conditional_expense() -> Expense {
        Expense::new(
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            "Cam Atölyesi",
            2000.0,
            "CAM",
            WorkScopeLevel::MalzemePlusImalat,
            HakEdisPolicy::Conditional,
        )
    }

    #[test]
    fn approved_override_wins_over_later_requests() {
        let mut book = ExpenseBook::new("Hull 42");
        let expense_id = book.add_expense(conditional_expense());
        let approved = OverrideRecord::approved(expense_id, true);
        let approved_id = approved.id;
        book.add_override(approved);
        book.add_override(OverrideRecord::pending(expense_id, "second request", 140.0));

        let active = book.active_override(expense_id).expect("override present");
        assert_eq!(active.id, approved_id);
        assert_eq!(book.overrides_map().len(), 1);
    }

    #[test]
    fn audit_trail_is_newest_first() {
        use crate::domain::audit::AuditAction;

        let mut book = ExpenseBook::new("Audit");
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        book.record_audit(AuditEntry::new(AuditAction::CreateExpense, first));
        book.record_audit(AuditEntry::new(AuditAction::DeleteExpense, second));

        let trail = book.audit_trail(10);
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].entity_id, second);
        assert_eq!(book.audit_trail(1)[0].action, AuditAction::DeleteExpense);
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let mut book = ExpenseBook::new("Prefixes");
        let id = book.add_expense(conditional_expense());
        let prefix = &id.to_string()[..8];
        let ids: Vec<Uuid> = book.expenses.iter().map(|e| e.id).collect();
        assert_eq!(ExpenseBook::resolve_id(&ids, prefix), Some(id));
        assert_eq!(ExpenseBook::resolve_id(&ids, ""), None);
    }

    #[test]
    fn open_reminders_sorted_by_severity() {
        let mut book = ExpenseBook::new("Reminders");
        book.add_reminder(Reminder::new(
            ReminderKind::OverrideRejected,
            Severity::Low,
            "low",
            "low",
            None,
        ));
        book.add_reminder(Reminder::new(
            ReminderKind::MissingDocument,
            Severity::High,
            "high",
            "high",
            None,
        ));
        let open = book.open_reminders();
        assert_eq!(open[0].severity, Severity::High);
        assert_eq!(open[1].severity, Severity::Low);
    }
}
