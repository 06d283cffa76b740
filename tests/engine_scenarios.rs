use std::collections::HashMap;

use boatbuild_core::{
    domain::{
        Expense, ExpenseDraft, HakEdisPolicy, OverrideRecord, OverrideState, WorkScopeLevel,
    },
    engine::{decide, CommissionEngine, DecisionReason},
};
use chrono::NaiveDate;

fn expense(amount: f64, scope: WorkScopeLevel, policy: HakEdisPolicy) -> Expense {
    Expense::new(
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        "Tersane Usta",
        amount,
        "KAYNAK",
        scope,
        policy,
    )
}

#[test]
fn pure_imalat_ignores_declared_policy() {
    let decision = decide(
        1000.0,
        Some(WorkScopeLevel::PureImalat),
        Some(HakEdisPolicy::AlwaysExcluded),
        OverrideState::None,
    );
    assert!(decision.is_eligible);
    assert_eq!(decision.hak_edis_amount, 70.0);
    assert_eq!(decision.reason, DecisionReason::PureImalatAlwaysIncluded);
}

#[test]
fn excluded_scope_wins_over_policy_and_override() {
    let decision = decide(
        500.0,
        Some(WorkScopeLevel::NonImalat),
        Some(HakEdisPolicy::AlwaysIncluded),
        OverrideState::Approved { eligibility: true },
    );
    assert!(!decision.is_eligible);
    assert_eq!(decision.hak_edis_amount, 0.0);
    assert_eq!(decision.reason, DecisionReason::WorkScopeExcluded);
}

#[test]
fn conditional_reports_potential_until_approved() {
    let pending = decide(
        2000.0,
        Some(WorkScopeLevel::MalzemePlusImalat),
        Some(HakEdisPolicy::Conditional),
        OverrideState::None,
    );
    assert!(!pending.is_eligible);
    assert_eq!(pending.hak_edis_amount, 0.0);
    assert!(pending.requires_approval);
    assert_eq!(pending.potential_amount, Some(140.0));

    let approved = decide(
        2000.0,
        Some(WorkScopeLevel::MalzemePlusImalat),
        Some(HakEdisPolicy::Conditional),
        OverrideState::Approved { eligibility: true },
    );
    assert!(approved.is_eligible);
    assert_eq!(approved.hak_edis_amount, 140.0);
    assert_eq!(approved.reason, DecisionReason::ConditionalOwnerApproved);
    assert!(!approved.requires_approval);
}

#[test]
fn negative_amount_is_reported_not_raised() {
    let decision = decide(
        -5.0,
        Some(WorkScopeLevel::PureImalat),
        Some(HakEdisPolicy::AlwaysIncluded),
        OverrideState::None,
    );
    assert_eq!(decision.reason, DecisionReason::InvalidAmount);
    assert_eq!(decision.hak_edis_amount, 0.0);
    assert!(decision.is_error());
}

#[test]
fn unknown_classification_text_is_a_configuration_failure() {
    let draft = ExpenseDraft::new(100.0, "CAM")
        .scope("HALF_IMALAT")
        .policy("CONDITIONAL");
    let decision = CommissionEngine::default().decide_draft(&draft, OverrideState::None);
    assert_eq!(decision.reason, DecisionReason::UnknownConfiguration);
    assert!(decision.is_error());
}

#[test]
fn batch_exposure_splits_realized_and_conditional() {
    let expenses = vec![
        expense(1000.0, WorkScopeLevel::PureImalat, HakEdisPolicy::AlwaysIncluded),
        expense(2000.0, WorkScopeLevel::MalzemePlusImalat, HakEdisPolicy::Conditional),
        expense(300.0, WorkScopeLevel::NonImalat, HakEdisPolicy::AlwaysExcluded),
    ];
    let engine = CommissionEngine::default();
    let exposure = engine.calculate_exposure(&expenses, &HashMap::new());
    assert_eq!(exposure.realized_hak_edis, 70.0);
    assert_eq!(exposure.potential_hak_edis, 210.0);
    assert_eq!(exposure.conditional_exposure, 140.0);
    assert_eq!(exposure.remaining_potential, 140.0);

    let mut overrides = HashMap::new();
    overrides.insert(expenses[1].id, OverrideRecord::approved(expenses[1].id, true));
    let approved = engine.calculate_exposure(&expenses, &overrides);
    assert_eq!(approved.realized_hak_edis, 210.0);
    assert_eq!(approved.conditional_exposure, 0.0);
    assert_eq!(approved.remaining_potential, 0.0);

    let batch = engine.calculate_batch(&expenses, &overrides);
    let ids: Vec<_> = batch.iter().map(|entry| entry.expense_id).collect();
    let expected: Vec<_> = expenses.iter().map(|e| e.id).collect();
    assert_eq!(ids, expected);
}

#[test]
fn custom_rate_flows_through_every_amount() {
    let engine = CommissionEngine::new(0.05);
    let decision = engine.decide(
        1000.0,
        Some(WorkScopeLevel::PureImalat),
        Some(HakEdisPolicy::AlwaysIncluded),
        OverrideState::None,
    );
    assert_eq!(decision.hak_edis_amount, 50.0);
}
