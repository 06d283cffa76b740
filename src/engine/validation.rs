use serde::{Deserialize, Serialize};

use super::decision::is_valid_amount;
use crate::domain::{ExpenseDraft, HakEdisPolicy, WorkScopeLevel};

/// Every classification problem found in a draft, not just the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Pre-commit gate run before an expense is persisted.
pub fn validate(draft: &ExpenseDraft) -> ValidationReport {
    let mut errors = Vec::new();

    if ExpenseDraft::text(&draft.primary_tag).is_none() {
        errors.push("primary_tag is required".to_string());
    }

    match ExpenseDraft::text(&draft.work_scope_level) {
        None => errors.push("work_scope_level is required".to_string()),
        Some(raw) => {
            if let Err(err) = WorkScopeLevel::parse_exact(raw) {
                errors.push(err.to_string());
            }
        }
    }

    match ExpenseDraft::text(&draft.hak_edis_policy) {
        None => errors.push("hak_edis_policy is required".to_string()),
        Some(raw) => {
            if let Err(err) = HakEdisPolicy::parse_exact(raw) {
                errors.push(err.to_string());
            }
        }
    }

    if !draft.amount.is_some_and(is_valid_amount) {
        errors.push("amount must be a positive number".to_string());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_draft_is_valid() {
        let draft = ExpenseDraft::new(450.0, "KAYNAK")
            .scope("PURE_IMALAT")
            .policy("ALWAYS_INCLUDED");
        let report = validate(&draft);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn collects_every_error() {
        let report = validate(&ExpenseDraft::default());
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "primary_tag is required",
                "work_scope_level is required",
                "hak_edis_policy is required",
                "amount must be a positive number",
            ]
        );
    }

    #[test]
    fn classification_values_must_match_exactly() {
        let draft = ExpenseDraft::new(450.0, "KAYNAK")
            .scope("pure_imalat")
            .policy("conditional");
        let report = validate(&draft);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "Invalid work_scope_level: pure_imalat",
                "Invalid hak_edis_policy: conditional",
            ]
        );
    }

    #[test]
    fn distinguishes_missing_from_invalid() {
        let draft = ExpenseDraft::new(-1.0, "  ")
            .scope("SOMETIMES_IMALAT")
            .policy("MAYBE");
        let report = validate(&draft);
        assert_eq!(
            report.errors,
            vec![
                "primary_tag is required",
                "Invalid work_scope_level: SOMETIMES_IMALAT",
                "Invalid hak_edis_policy: MAYBE",
                "amount must be a positive number",
            ]
        );
    }
}
