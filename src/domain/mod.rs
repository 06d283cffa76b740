//! Pure record types: classification enums, expenses, vendors, overrides, reminders,
//! the audit trail and the book that holds them. No I/O.

pub mod audit;
pub mod book;
pub mod classification;
pub mod common;
pub mod expense;
pub mod overrides;
pub mod reminder;
pub mod vendor;

pub use audit::{AuditAction, AuditEntry};
pub use book::ExpenseBook;
pub use classification::{HakEdisPolicy, UnknownVariant, WorkScopeLevel};
pub use common::{Displayable, Identifiable};
pub use expense::{Expense, ExpenseChanges, ExpenseDraft};
pub use overrides::{OverrideRecord, OverrideState, OverrideStatus};
pub use reminder::{Reminder, ReminderKind, Severity};
pub use vendor::Vendor;
