//! Default classification per category code and the future-projection report built on it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{exposure::override_state, round2, CommissionEngine};
use crate::domain::{Expense, HakEdisPolicy, OverrideRecord, WorkScopeLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefault {
    pub tag: &'static str,
    pub name: &'static str,
    pub work_scope_level: WorkScopeLevel,
    pub hak_edis_policy: HakEdisPolicy,
}

const fn entry(
    tag: &'static str,
    name: &'static str,
    work_scope_level: WorkScopeLevel,
    hak_edis_policy: HakEdisPolicy,
) -> CategoryDefault {
    CategoryDefault {
        tag,
        name,
        work_scope_level,
        hak_edis_policy,
    }
}

pub const CATEGORY_DEFAULTS: [CategoryDefault; 8] = [
    entry("CAM", "Cam (Glass)", WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional),
    entry("PARKE", "Parke (Flooring)", WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional),
    entry("BOYA", "Boya (Paint)", WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional),
    entry("MOBILYA", "Mobilya (Furniture)", WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional),
    entry("KAYNAK", "Kaynak (Welding)", WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
    entry("MONTAJ", "Montaj (Assembly)", WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
    entry("TESISAT", "Tesisat (Plumbing)", WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
    entry("ELEKTRIK", "Elektrik (Electrical)", WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
];

/// Catalog entry for a tag, matched case-insensitively.
pub fn category_default(tag: &str) -> Option<&'static CategoryDefault> {
    let tag = tag.trim();
    CATEGORY_DEFAULTS
        .iter()
        .find(|category| category.tag.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub tag: String,
    pub name: String,
    pub work_scope_level: WorkScopeLevel,
    pub hak_edis_policy: HakEdisPolicy,
    pub expense_count: usize,
    pub total_spent: f64,
    pub paid_hak_edis: f64,
    pub pending_potential: f64,
    pub estimated_exposure: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionTotals {
    pub total_spent: f64,
    pub paid_hak_edis: f64,
    pub pending_potential: f64,
    pub total_exposure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub rows: Vec<ProjectionRow>,
    pub totals: ProjectionTotals,
}

impl CommissionEngine {
    /// One row per catalog category, in catalog order, including categories with no spend.
    pub fn projection(
        &self,
        expenses: &[Expense],
        overrides: &HashMap<Uuid, OverrideRecord>,
    ) -> ProjectionReport {
        let mut rows = Vec::with_capacity(CATEGORY_DEFAULTS.len());
        let mut totals = ProjectionTotals::default();

        for category in &CATEGORY_DEFAULTS {
            let mut row = ProjectionRow {
                tag: category.tag.to_string(),
                name: category.name.to_string(),
                work_scope_level: category.work_scope_level,
                hak_edis_policy: category.hak_edis_policy,
                expense_count: 0,
                total_spent: 0.0,
                paid_hak_edis: 0.0,
                pending_potential: 0.0,
                estimated_exposure: 0.0,
            };
            for expense in expenses
                .iter()
                .filter(|e| e.primary_tag.trim().eq_ignore_ascii_case(category.tag))
            {
                let decision = self.decide_expense(expense, override_state(overrides, expense.id));
                row.expense_count += 1;
                row.total_spent += expense.amount;
                if decision.is_eligible {
                    row.paid_hak_edis += decision.hak_edis_amount;
                }
                if decision.requires_approval {
                    row.pending_potential += decision.potential_amount.unwrap_or_default();
                }
            }
            row.total_spent = round2(row.total_spent);
            row.paid_hak_edis = round2(row.paid_hak_edis);
            row.pending_potential = round2(row.pending_potential);
            row.estimated_exposure = self.commission(row.total_spent);

            totals.total_spent += row.total_spent;
            totals.paid_hak_edis += row.paid_hak_edis;
            totals.pending_potential += row.pending_potential;
            totals.total_exposure += row.estimated_exposure;
            rows.push(row);
        }

        ProjectionReport {
            rows,
            totals: ProjectionTotals {
                total_spent: round2(totals.total_spent),
                paid_hak_edis: round2(totals.paid_hak_edis),
                pending_potential: round2(totals.pending_potential),
                total_exposure: round2(totals.total_exposure),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tagged(tag: &str, amount: f64) -> Expense {
        let defaults = category_default(tag).expect("catalog tag");
        Expense::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "Atölye",
            amount,
            tag,
            defaults.work_scope_level,
            defaults.hak_edis_policy,
        )
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let cam = category_default(" cam ").unwrap();
        assert_eq!(cam.work_scope_level, WorkScopeLevel::MalzemePlusImalat);
        assert_eq!(cam.hak_edis_policy, HakEdisPolicy::Conditional);
        assert!(category_default("REKLAM").is_none());
    }

    #[test]
    fn projection_covers_every_category() {
        let engine = CommissionEngine::default();
        let expenses = vec![tagged("KAYNAK", 1000.0), tagged("CAM", 500.0), tagged("CAM", 500.0)];
        let report = engine.projection(&expenses, &HashMap::new());
        assert_eq!(report.rows.len(), CATEGORY_DEFAULTS.len());

        let cam = report.rows.iter().find(|r| r.tag == "CAM").unwrap();
        assert_eq!(cam.expense_count, 2);
        assert_eq!(cam.total_spent, 1000.0);
        assert_eq!(cam.paid_hak_edis, 0.0);
        assert_eq!(cam.pending_potential, 70.0);
        assert_eq!(cam.estimated_exposure, 70.0);

        let kaynak = report.rows.iter().find(|r| r.tag == "KAYNAK").unwrap();
        assert_eq!(kaynak.paid_hak_edis, 70.0);

        assert_eq!(report.totals.total_spent, 2000.0);
        assert_eq!(report.totals.paid_hak_edis, 70.0);
        assert_eq!(report.totals.pending_potential, 70.0);
        assert_eq!(report.totals.total_exposure, 140.0);
    }
}
