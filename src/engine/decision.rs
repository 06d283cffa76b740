use std::fmt;

use serde::{Deserialize, Serialize};

use super::CommissionEngine;
use crate::domain::{
    expense::{Expense, ExpenseDraft},
    HakEdisPolicy, OverrideState, WorkScopeLevel,
};

/// Why the engine reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    InvalidAmount,
    MissingWorkScopeLevel,
    MissingHakEdisPolicy,
    WorkScopeExcluded,
    PureImalatAlwaysIncluded,
    PolicyAlwaysIncluded,
    PolicyAlwaysExcluded,
    ConditionalOwnerApproved,
    ConditionalPendingApproval,
    UnknownConfiguration,
}

impl DecisionReason {
    pub fn code(&self) -> &'static str {
        match self {
            DecisionReason::InvalidAmount => "INVALID_AMOUNT",
            DecisionReason::MissingWorkScopeLevel => "MISSING_WORK_SCOPE_LEVEL",
            DecisionReason::MissingHakEdisPolicy => "MISSING_HAK_EDIS_POLICY",
            DecisionReason::WorkScopeExcluded => "WORK_SCOPE_EXCLUDED",
            DecisionReason::PureImalatAlwaysIncluded => "PURE_IMALAT_ALWAYS_INCLUDED",
            DecisionReason::PolicyAlwaysIncluded => "POLICY_ALWAYS_INCLUDED",
            DecisionReason::PolicyAlwaysExcluded => "POLICY_ALWAYS_EXCLUDED",
            DecisionReason::ConditionalOwnerApproved => "CONDITIONAL_OWNER_APPROVED",
            DecisionReason::ConditionalPendingApproval => "CONDITIONAL_PENDING_APPROVAL",
            DecisionReason::UnknownConfiguration => "UNKNOWN_CONFIGURATION",
        }
    }

    /// Input problems the caller can fix and resubmit.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DecisionReason::InvalidAmount
                | DecisionReason::MissingWorkScopeLevel
                | DecisionReason::MissingHakEdisPolicy
        )
    }

    /// Any verdict that did not come from the decision table proper.
    pub fn is_failure(&self) -> bool {
        self.is_input_error() || *self == DecisionReason::UnknownConfiguration
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of a single eligibility decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub is_eligible: bool,
    pub hak_edis_amount: f64,
    pub reason: DecisionReason,
    #[serde(default)]
    pub requires_approval: bool,
    /// Commission the expense would earn once approved; set only while approval is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub details: String,
}

impl Decision {
    fn eligible(amount: f64, reason: DecisionReason, details: impl Into<String>) -> Self {
        Self {
            is_eligible: true,
            hak_edis_amount: amount,
            reason,
            requires_approval: false,
            potential_amount: None,
            error: None,
            details: details.into(),
        }
    }

    fn excluded(reason: DecisionReason, details: impl Into<String>) -> Self {
        Self {
            is_eligible: false,
            hak_edis_amount: 0.0,
            reason,
            requires_approval: false,
            potential_amount: None,
            error: None,
            details: details.into(),
        }
    }

    fn failed(reason: DecisionReason, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            is_eligible: false,
            hak_edis_amount: 0.0,
            reason,
            requires_approval: false,
            potential_amount: None,
            details: error.clone(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl CommissionEngine {
    /// Runs the decision table.
    ///
    /// Scope exclusion is checked before any policy branch: `NON_IMALAT` and
    /// `PURE_MALZEME` can never be made eligible, and `PURE_IMALAT` ignores policy and
    /// override entirely.
    pub fn decide(
        &self,
        amount: f64,
        work_scope_level: Option<WorkScopeLevel>,
        hak_edis_policy: Option<HakEdisPolicy>,
        override_state: OverrideState,
    ) -> Decision {
        if !is_valid_amount(amount) {
            return Decision::failed(DecisionReason::InvalidAmount, "Amount must be positive");
        }
        let Some(scope) = work_scope_level else {
            return Decision::failed(
                DecisionReason::MissingWorkScopeLevel,
                "work_scope_level is mandatory",
            );
        };
        let Some(policy) = hak_edis_policy else {
            return Decision::failed(
                DecisionReason::MissingHakEdisPolicy,
                "hak_edis_policy is mandatory",
            );
        };

        match (scope, policy) {
            (WorkScopeLevel::NonImalat | WorkScopeLevel::PureMalzeme, _) => Decision::excluded(
                DecisionReason::WorkScopeExcluded,
                format!("{scope} is never eligible for hak ediş"),
            ),
            (WorkScopeLevel::PureImalat, _) => Decision::eligible(
                self.commission(amount),
                DecisionReason::PureImalatAlwaysIncluded,
                "Pure manufacturing labor is always eligible",
            ),
            (WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::AlwaysIncluded) => {
                Decision::eligible(
                    self.commission(amount),
                    DecisionReason::PolicyAlwaysIncluded,
                    "Material + installation with ALWAYS_INCLUDED policy",
                )
            }
            (WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::AlwaysExcluded) => {
                Decision::excluded(
                    DecisionReason::PolicyAlwaysExcluded,
                    "Material + installation with ALWAYS_EXCLUDED policy",
                )
            }
            (WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional) => {
                if override_state.grants_eligibility() {
                    Decision::eligible(
                        self.commission(amount),
                        DecisionReason::ConditionalOwnerApproved,
                        "Conditional item approved by owner",
                    )
                } else {
                    let mut decision = Decision::excluded(
                        DecisionReason::ConditionalPendingApproval,
                        "Conditional item awaiting owner approval, excluded until then",
                    );
                    decision.requires_approval = true;
                    decision.potential_amount = Some(self.commission(amount));
                    decision
                }
            }
        }
    }

    pub fn decide_expense(&self, expense: &Expense, override_state: OverrideState) -> Decision {
        self.decide(
            expense.amount,
            Some(expense.work_scope_level),
            Some(expense.hak_edis_policy),
            override_state,
        )
    }

    /// Decides on unvalidated input.
    ///
    /// Present but unrecognized classification strings yield `UNKNOWN_CONFIGURATION`.
    pub fn decide_draft(&self, draft: &ExpenseDraft, override_state: OverrideState) -> Decision {
        let amount = draft.amount.unwrap_or(f64::NAN);
        if !is_valid_amount(amount) {
            return Decision::failed(DecisionReason::InvalidAmount, "Amount must be positive");
        }
        let Some(scope_text) = ExpenseDraft::text(&draft.work_scope_level) else {
            return Decision::failed(
                DecisionReason::MissingWorkScopeLevel,
                "work_scope_level is mandatory",
            );
        };
        let Some(policy_text) = ExpenseDraft::text(&draft.hak_edis_policy) else {
            return Decision::failed(
                DecisionReason::MissingHakEdisPolicy,
                "hak_edis_policy is mandatory",
            );
        };

        match (
            WorkScopeLevel::parse_exact(scope_text),
            HakEdisPolicy::parse_exact(policy_text),
        ) {
            (Ok(scope), Ok(policy)) => {
                self.decide(amount, Some(scope), Some(policy), override_state)
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(problem = %err, "hak ediş decision fell through the decision table");
                Decision::failed(
                    DecisionReason::UnknownConfiguration,
                    format!("Unable to determine hak ediş eligibility: {err}"),
                )
            }
        }
    }
}

/// Amounts must be finite and strictly positive.
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}

/// Decides with the default 7% engine.
pub fn decide(
    amount: f64,
    work_scope_level: Option<WorkScopeLevel>,
    hak_edis_policy: Option<HakEdisPolicy>,
    override_state: OverrideState,
) -> Decision {
    CommissionEngine::default().decide(amount, work_scope_level, hak_edis_policy, override_state)
}
