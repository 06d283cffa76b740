//! Batch decisions and the realized/potential exposure fold used by reporting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{decision::is_valid_amount, round2, CommissionEngine, Decision};
use crate::domain::{Expense, OverrideRecord, OverrideState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub expense_id: Uuid,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Aggregate commission figures over a set of expenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// Commission on expenses that are eligible today.
    pub realized_hak_edis: f64,
    /// Ceiling if every labor-bearing expense were compensated.
    pub potential_hak_edis: f64,
    /// Commission waiting on owner approval.
    pub conditional_exposure: f64,
    pub remaining_potential: f64,
}

impl CommissionEngine {
    /// Decides every expense, preserving input order.
    pub fn calculate_batch(
        &self,
        expenses: &[Expense],
        overrides: &HashMap<Uuid, OverrideRecord>,
    ) -> Vec<BatchEntry> {
        expenses
            .iter()
            .map(|expense| BatchEntry {
                expense_id: expense.id,
                decision: self.decide_expense(expense, override_state(overrides, expense.id)),
            })
            .collect()
    }

    pub fn calculate_exposure(
        &self,
        expenses: &[Expense],
        overrides: &HashMap<Uuid, OverrideRecord>,
    ) -> Exposure {
        let mut realized = 0.0;
        let mut potential = 0.0;
        let mut conditional = 0.0;

        for expense in expenses {
            let decision = self.decide_expense(expense, override_state(overrides, expense.id));
            if decision.is_eligible {
                realized += decision.hak_edis_amount;
            }
            if decision.requires_approval {
                conditional += decision.potential_amount.unwrap_or_default();
            }
            // Potential ignores policy.
            if expense.work_scope_level.has_labor() && is_valid_amount(expense.amount) {
                potential += self.commission(expense.amount);
            }
        }

        Exposure {
            realized_hak_edis: round2(realized),
            potential_hak_edis: round2(potential),
            conditional_exposure: round2(conditional),
            remaining_potential: round2(potential - realized),
        }
    }
}

/// Maps a stored override to engine state; only APPROVED records carry eligibility.
pub fn override_state(overrides: &HashMap<Uuid, OverrideRecord>, expense_id: Uuid) -> OverrideState {
    OverrideState::from_record(overrides.get(&expense_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HakEdisPolicy, WorkScopeLevel};
    use crate::engine::DecisionReason;
    use chrono::NaiveDate;

    fn expense(amount: f64, scope: WorkScopeLevel, policy: HakEdisPolicy) -> Expense {
        Expense::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            "Tersane",
            amount,
            "GENEL",
            scope,
            policy,
        )
    }

    fn three_expense_batch() -> Vec<Expense> {
        vec![
            expense(1000.0, WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
            expense(
                2000.0,
                WorkScopeLevel::MalzemePlusImalat,
                HakEdisPolicy::Conditional,
            ),
            expense(300.0, WorkScopeLevel::NonImalat, HakEdisPolicy::AlwaysExcluded),
        ]
    }

    #[test]
    fn exposure_of_mixed_batch() {
        let engine = CommissionEngine::default();
        let exposure = engine.calculate_exposure(&three_expense_batch(), &HashMap::new());
        assert_eq!(exposure.realized_hak_edis, 70.0);
        assert_eq!(exposure.potential_hak_edis, 210.0);
        assert_eq!(exposure.conditional_exposure, 140.0);
        assert_eq!(exposure.remaining_potential, 140.0);
    }

    #[test]
    fn approved_override_moves_conditional_into_realized() {
        let engine = CommissionEngine::default();
        let expenses = three_expense_batch();
        let mut overrides = HashMap::new();
        overrides.insert(
            expenses[1].id,
            OverrideRecord::approved(expenses[1].id, true),
        );
        let exposure = engine.calculate_exposure(&expenses, &overrides);
        assert_eq!(exposure.realized_hak_edis, 210.0);
        assert_eq!(exposure.conditional_exposure, 0.0);
        assert_eq!(exposure.remaining_potential, 0.0);
    }

    #[test]
    fn pending_override_is_not_treated_as_approval() {
        let engine = CommissionEngine::default();
        let expenses = three_expense_batch();
        let mut overrides = HashMap::new();
        overrides.insert(
            expenses[1].id,
            OverrideRecord::pending(expenses[1].id, "labor heavy install", 140.0),
        );
        let batch = engine.calculate_batch(&expenses, &overrides);
        assert_eq!(
            batch[1].decision.reason,
            DecisionReason::ConditionalPendingApproval
        );
    }

    #[test]
    fn excluded_mixed_scope_still_counts_towards_potential() {
        let engine = CommissionEngine::default();
        let expenses = vec![expense(
            1000.0,
            WorkScopeLevel::MalzemePlusImalat,
            HakEdisPolicy::AlwaysExcluded,
        )];
        let exposure = engine.calculate_exposure(&expenses, &HashMap::new());
        assert_eq!(exposure.realized_hak_edis, 0.0);
        assert_eq!(exposure.potential_hak_edis, 70.0);
        assert_eq!(exposure.remaining_potential, 70.0);
    }

    #[test]
    fn batch_preserves_order_and_ids() {
        let engine = CommissionEngine::default();
        let expenses = three_expense_batch();
        let batch = engine.calculate_batch(&expenses, &HashMap::new());
        let ids: Vec<Uuid> = batch.iter().map(|entry| entry.expense_id).collect();
        let expected: Vec<Uuid> = expenses.iter().map(|e| e.id).collect();
        assert_eq!(ids, expected);
        assert!(batch[0].decision.is_eligible);
        assert!(!batch[2].decision.is_eligible);
    }

    #[test]
    fn remaining_potential_identity_holds_for_awkward_amounts() {
        let engine = CommissionEngine::default();
        let amounts = [0.01, 1.005, 33.33, 1234.567, 99999.99, 7.77];
        let expenses: Vec<Expense> = amounts
            .iter()
            .enumerate()
            .map(|(idx, amount)| {
                let scope = WorkScopeLevel::ALL[idx % 4];
                let policy = HakEdisPolicy::ALL[idx % 3];
                expense(*amount, scope, policy)
            })
            .collect();
        let exposure = engine.calculate_exposure(&expenses, &HashMap::new());
        let identity = exposure.potential_hak_edis - exposure.realized_hak_edis;
        assert!((exposure.remaining_potential - identity).abs() <= 0.01);
    }
}
