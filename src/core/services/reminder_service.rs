use uuid::Uuid;

use crate::core::errors::CrmError;
use crate::domain::{AuditAction, AuditEntry, ExpenseBook, Reminder, ReminderKind};

use super::{Role, ServiceResult};

pub struct ReminderService;

impl ReminderService {
    /// Open reminders, most urgent first.
    pub fn open(book: &ExpenseBook) -> Vec<&Reminder> {
        book.open_reminders()
    }

    /// Open reminder count per kind, in kind order.
    pub fn counts_by_kind(book: &ExpenseBook) -> Vec<(ReminderKind, usize)> {
        let mut counts: Vec<(ReminderKind, usize)> = Vec::new();
        for reminder in book.reminders.iter().filter(|r| !r.resolved) {
            match counts.iter_mut().find(|(kind, _)| *kind == reminder.kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((reminder.kind, 1)),
            }
        }
        counts.sort_by_key(|(kind, _)| kind.as_str());
        counts
    }

    /// Marks a reminder handled, keeping optional notes.
    pub fn resolve(
        book: &mut ExpenseBook,
        id: Uuid,
        role: Role,
        notes: Option<String>,
    ) -> ServiceResult<()> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let reminder = book
            .reminder_mut(id)
            .ok_or_else(|| CrmError::not_found("Reminder", id))?;
        if reminder.resolved {
            return Err(CrmError::invalid_state(
                "ALREADY_RESOLVED",
                "Reminder is already resolved",
            ));
        }
        let audit = AuditEntry::new(AuditAction::ResolveReminder, id)
            .by(role)
            .before(&*reminder);
        reminder.resolve_with_notes(notes);
        let audit = audit.after(&*reminder);
        book.record_audit(audit);
        book.touch();
        tracing::info!(reminder_id = %id, "reminder resolved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    fn book_with_reminders() -> (ExpenseBook, Uuid) {
        let mut book = ExpenseBook::new("Reminders");
        let id = book.add_reminder(Reminder::new(
            ReminderKind::MissingDocument,
            Severity::High,
            "Documentation Required",
            "invoice missing",
            None,
        ));
        book.add_reminder(Reminder::new(
            ReminderKind::MissingDocument,
            Severity::High,
            "Documentation Required",
            "receipt missing",
            None,
        ));
        book.add_reminder(Reminder::new(
            ReminderKind::ConditionalPending,
            Severity::Medium,
            "Conditional Hak Ediş Pending",
            "needs approval",
            None,
        ));
        (book, id)
    }

    #[test]
    fn resolve_closes_once_and_audits() {
        let (mut book, id) = book_with_reminders();
        ReminderService::resolve(&mut book, id, Role::Operation, Some(" uploaded ".into()))
            .unwrap();

        let reminder = book.reminder(id).unwrap();
        assert!(reminder.resolved);
        assert_eq!(reminder.resolution_notes.as_deref(), Some("uploaded"));
        assert_eq!(ReminderService::open(&book).len(), 2);
        let entry = book.audit.last().unwrap();
        assert_eq!(entry.action, AuditAction::ResolveReminder);
        assert_eq!(entry.actor.as_deref(), Some("OPERATION"));

        let err = ReminderService::resolve(&mut book, id, Role::Owner, None).unwrap_err();
        assert_eq!(err.code(), Some("ALREADY_RESOLVED"));
        let err = ReminderService::resolve(&mut book, Uuid::new_v4(), Role::Owner, None)
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound { .. }));
    }

    #[test]
    fn counts_only_open_reminders() {
        let (mut book, id) = book_with_reminders();
        assert_eq!(
            ReminderService::counts_by_kind(&book),
            vec![
                (ReminderKind::ConditionalPending, 1),
                (ReminderKind::MissingDocument, 2)
            ]
        );
        ReminderService::resolve(&mut book, id, Role::Owner, None).unwrap();
        assert_eq!(
            ReminderService::counts_by_kind(&book)[1],
            (ReminderKind::MissingDocument, 1)
        );
    }
}
