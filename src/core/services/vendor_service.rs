use uuid::Uuid;

use crate::core::errors::CrmError;
use crate::domain::common::normalize_name;
use crate::domain::{AuditAction, AuditEntry, Expense, ExpenseBook, Vendor};

use super::ServiceResult;

const MAX_SUGGESTION_DISTANCE: usize = 3;

pub struct VendorService;

impl VendorService {
    pub fn add(book: &mut ExpenseBook, mut vendor: Vendor) -> ServiceResult<Uuid> {
        Self::validate_name(book, None, &vendor.name)?;
        vendor.name = vendor.name.trim().to_string();
        let audit = AuditEntry::new(AuditAction::CreateVendor, vendor.id).after(&vendor);
        let id = book.add_vendor(vendor);
        book.record_audit(audit);
        tracing::info!(vendor_id = %id, "vendor added");
        Ok(id)
    }

    pub fn edit(
        book: &mut ExpenseBook,
        id: Uuid,
        name: &str,
        notes: Option<String>,
    ) -> ServiceResult<()> {
        Self::validate_name(book, Some(id), name)?;
        let vendor = book
            .vendor_mut(id)
            .ok_or_else(|| CrmError::not_found("Vendor", id))?;
        let audit = AuditEntry::new(AuditAction::UpdateVendor, id).before(&*vendor);
        vendor.name = name.trim().to_string();
        vendor.notes = notes.filter(|n| !n.trim().is_empty());
        let audit = audit.after(&*vendor);
        book.record_audit(audit);
        book.touch();
        Ok(())
    }

    pub fn set_requires_documentation(
        book: &mut ExpenseBook,
        id: Uuid,
        required: bool,
    ) -> ServiceResult<()> {
        let vendor = book
            .vendor_mut(id)
            .ok_or_else(|| CrmError::not_found("Vendor", id))?;
        vendor.requires_documentation = required;
        book.touch();
        Ok(())
    }

    pub fn remove(book: &mut ExpenseBook, id: Uuid) -> ServiceResult<()> {
        if book.expenses.iter().any(|e| e.vendor_id == Some(id)) {
            return Err(CrmError::invalid_state(
                "VENDOR_IN_USE",
                "Vendor has linked expenses",
            ));
        }
        let index = book
            .vendors
            .iter()
            .position(|vendor| vendor.id == id)
            .ok_or_else(|| CrmError::not_found("Vendor", id))?;
        let removed = book.vendors.remove(index);
        book.record_audit(AuditEntry::new(AuditAction::DeleteVendor, id).before(&removed));
        book.touch();
        Ok(())
    }

    pub fn list(book: &ExpenseBook) -> Vec<&Vendor> {
        let mut vendors: Vec<&Vendor> = book.vendors.iter().collect();
        vendors.sort_by_key(|vendor| vendor.name_key());
        vendors
    }

    /// True when the expense cannot be attributed to any known vendor.
    pub fn is_unassigned(book: &ExpenseBook, expense: &Expense) -> bool {
        if expense
            .vendor_id
            .is_some_and(|id| book.vendor(id).is_some())
        {
            return false;
        }
        !book
            .vendors
            .iter()
            .any(|vendor| name_matches(vendor, &expense.vendor_name))
    }

    pub fn unassigned(book: &ExpenseBook) -> Vec<&Expense> {
        book.expenses
            .iter()
            .filter(|expense| Self::is_unassigned(book, expense))
            .collect()
    }

    /// Expenses linked by id, or by name when not linked to another vendor.
    pub fn expenses_for_vendor(book: &ExpenseBook, id: Uuid) -> ServiceResult<Vec<&Expense>> {
        let vendor = book
            .vendor(id)
            .ok_or_else(|| CrmError::not_found("Vendor", id))?;
        Ok(book
            .expenses
            .iter()
            .filter(|expense| match expense.vendor_id {
                Some(linked) if book.vendor(linked).is_some() => linked == id,
                _ => name_matches(vendor, &expense.vendor_name),
            })
            .collect())
    }

    /// Known vendor names closest to `name`, best first.
    pub fn suggest<'a>(book: &'a ExpenseBook, name: &str) -> Vec<&'a str> {
        let needle = normalize_name(name);
        if needle.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, &str)> = book
            .vendors
            .iter()
            .map(|vendor| (strsim::levenshtein(&needle, &vendor.name_key()), vendor.name.as_str()))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().map(|(_, name)| name).collect()
    }

    fn validate_name(book: &ExpenseBook, exclude: Option<Uuid>, candidate: &str) -> ServiceResult<()> {
        let normalized = normalize_name(candidate);
        if normalized.is_empty() {
            return Err(CrmError::Validation(vec!["vendor name is required".into()]));
        }
        let duplicate = book.vendors.iter().any(|vendor| {
            vendor.name_key() == normalized && exclude.map_or(true, |id| vendor.id != id)
        });
        if duplicate {
            Err(CrmError::Validation(vec![format!(
                "Vendor `{}` already exists",
                candidate.trim()
            )]))
        } else {
            Ok(())
        }
    }
}

fn first_word(name: &str) -> Option<&str> {
    name.split_whitespace().next()
}

fn name_matches(vendor: &Vendor, raw: &str) -> bool {
    let candidate = normalize_name(raw);
    if candidate.is_empty() {
        return false;
    }
    let key = vendor.name_key();
    key == candidate || (first_word(&key).is_some() && first_word(&key) == first_word(&candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HakEdisPolicy, WorkScopeLevel};
    use chrono::NaiveDate;

    fn expense(vendor_name: &str) -> Expense {
        Expense::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            vendor_name,
            100.0,
            "MONTAJ",
            WorkScopeLevel::PureImalat,
            HakEdisPolicy::AlwaysIncluded,
        )
    }

    #[test]
    fn names_are_unique_case_insensitively() {
        let mut book = ExpenseBook::new("Vendors");
        VendorService::add(&mut book, Vendor::new("Baran Marin")).unwrap();
        let err = VendorService::add(&mut book, Vendor::new("  baran marin ")).unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        assert!(VendorService::add(&mut book, Vendor::new(" ")).is_err());
    }

    #[test]
    fn removal_refused_while_linked() {
        let mut book = ExpenseBook::new("Vendors");
        let id = VendorService::add(&mut book, Vendor::new("Etkin")).unwrap();
        book.add_expense(expense("Etkin").with_vendor(id));
        let err = VendorService::remove(&mut book, id).unwrap_err();
        assert_eq!(err.code(), Some("VENDOR_IN_USE"));

        book.expenses.clear();
        VendorService::remove(&mut book, id).unwrap();
        assert!(book.vendors.is_empty());
        let actions: Vec<AuditAction> = book.audit.iter().map(|entry| entry.action).collect();
        assert_eq!(actions, vec![AuditAction::CreateVendor, AuditAction::DeleteVendor]);
    }

    #[test]
    fn unassigned_matches_full_name_or_first_word() {
        let mut book = ExpenseBook::new("Vendors");
        let id = VendorService::add(&mut book, Vendor::new("Kaptan Tesisat")).unwrap();
        book.add_expense(expense("KAPTAN TESISAT"));
        book.add_expense(expense("kaptan"));
        book.add_expense(expense("Kaya Boya"));
        book.add_expense(expense(""));

        let unassigned: Vec<&str> = VendorService::unassigned(&book)
            .into_iter()
            .map(|e| e.vendor_name.as_str())
            .collect();
        assert_eq!(unassigned, vec!["Kaya Boya", ""]);
        assert_eq!(VendorService::expenses_for_vendor(&book, id).unwrap().len(), 2);
    }

    #[test]
    fn suggestions_rank_by_distance() {
        let mut book = ExpenseBook::new("Vendors");
        VendorService::add(&mut book, Vendor::new("Motor")).unwrap();
        VendorService::add(&mut book, Vendor::new("Montaj Usta")).unwrap();
        assert_eq!(VendorService::suggest(&book, "motr"), vec!["Motor"]);
        assert!(VendorService::suggest(&book, "completely different").is_empty());
    }
}
