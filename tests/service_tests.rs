mod common;

use boatbuild_core::{
    core::{
        errors::CrmError,
        services::{
            ExpenseFilter, ExpenseService, OverrideService, ReportService, Role, VendorService,
        },
    },
    domain::{ExpenseChanges, ExpenseDraft, OverrideStatus, ReminderKind},
    engine::{CommissionEngine, DecisionReason, DocumentationPolicy},
};
use chrono::NaiveDate;

fn conditional_draft(vendor: uuid::Uuid) -> ExpenseDraft {
    let mut draft = ExpenseDraft::new(2000.0, "CAM")
        .scope("MALZEME_PLUS_IMALAT")
        .policy("CONDITIONAL")
        .on(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
    draft.vendor_id = Some(vendor);
    draft
}

#[test]
fn override_lifecycle_unlocks_conditional_commission() {
    let (mut book, vendor) = common::book_with_vendor("Deniz Cam");
    let engine = CommissionEngine::default();
    let docs = DocumentationPolicy::default();

    let outcome =
        ExpenseService::create(&mut book, conditional_draft(vendor), &engine, &docs).unwrap();
    assert!(outcome.decision.requires_approval);
    assert_eq!(book.expenses[0].vendor_name, "Deniz Cam");
    assert!(book
        .open_reminders()
        .iter()
        .any(|r| r.kind == ReminderKind::ConditionalPending));

    let override_id = OverrideService::request(
        &mut book,
        outcome.expense_id,
        "Installation labor is the bulk of this job",
        &engine,
    )
    .unwrap();
    let pending = OverrideService::pending(&book, &engine);
    assert_eq!(pending.count, 1);
    assert_eq!(pending.total_potential_exposure, 140.0);

    let denied = OverrideService::approve(&mut book, override_id, Role::Operation, None, &engine);
    assert!(matches!(denied, Err(CrmError::Forbidden(_))));

    let decision =
        OverrideService::approve(&mut book, override_id, Role::Owner, None, &engine).unwrap();
    assert_eq!(decision.reason, DecisionReason::ConditionalOwnerApproved);
    let expense = book.expense(outcome.expense_id).unwrap();
    assert!(expense.is_hak_edis_eligible);
    assert_eq!(expense.hak_edis_amount, 140.0);
    assert!(book.open_reminders().is_empty());

    let again = OverrideService::approve(&mut book, override_id, Role::Owner, None, &engine);
    assert_eq!(again.unwrap_err().code(), Some("NOT_PENDING"));

    let repeat = OverrideService::request(
        &mut book,
        outcome.expense_id,
        "Asking once more for the same job",
        &engine,
    );
    assert_eq!(repeat.unwrap_err().code(), Some("ALREADY_APPROVED"));
    let expense = book.expense(outcome.expense_id).unwrap();
    assert!(expense.is_hak_edis_eligible);
    assert_eq!(expense.override_id, Some(override_id));
}

#[test]
fn policy_edit_while_pending_blocks_approval() {
    let (mut book, vendor) = common::book_with_vendor("Deniz Cam");
    let engine = CommissionEngine::default();
    let outcome = ExpenseService::create(
        &mut book,
        conditional_draft(vendor),
        &engine,
        &DocumentationPolicy::default(),
    )
    .unwrap();
    let override_id = OverrideService::request(
        &mut book,
        outcome.expense_id,
        "Installation labor is the bulk of this job",
        &engine,
    )
    .unwrap();

    let changes = ExpenseChanges {
        hak_edis_policy: Some("ALWAYS_EXCLUDED".into()),
        ..ExpenseChanges::default()
    };
    ExpenseService::update(&mut book, outcome.expense_id, changes, Role::Owner, &engine).unwrap();

    let approve = OverrideService::approve(&mut book, override_id, Role::Owner, None, &engine);
    assert_eq!(approve.unwrap_err().code(), Some("NOT_PENDING"));
    let expense = book.expense(outcome.expense_id).unwrap();
    assert!(!expense.is_hak_edis_eligible);
    assert_eq!(expense.override_id, None);
    assert_eq!(OverrideService::pending(&book, &engine).count, 0);
}

#[test]
fn rejected_override_keeps_expense_excluded_and_allows_new_request() {
    let (mut book, vendor) = common::book_with_vendor("Deniz Cam");
    let engine = CommissionEngine::default();
    let outcome = ExpenseService::create(
        &mut book,
        conditional_draft(vendor),
        &engine,
        &DocumentationPolicy::default(),
    )
    .unwrap();

    let first = OverrideService::request(
        &mut book,
        outcome.expense_id,
        "Fitting work done by the yard crew",
        &engine,
    )
    .unwrap();
    OverrideService::reject(&mut book, first, Role::Owner, "Material heavy invoice", &engine)
        .unwrap();

    let expense = book.expense(outcome.expense_id).unwrap();
    assert!(!expense.is_hak_edis_eligible);
    assert_eq!(expense.override_id, None);
    assert_eq!(
        OverrideService::list(&book, Some(OverrideStatus::Rejected)).len(),
        1
    );

    let second = OverrideService::request(
        &mut book,
        outcome.expense_id,
        "Labor breakdown attached to the invoice",
        &engine,
    );
    assert!(second.is_ok());
}

#[test]
fn rate_changes_are_owner_only_and_never_stored() {
    let (mut book, vendor) = common::book_with_vendor("Usta Kaynak");
    let engine = CommissionEngine::default();
    let mut draft = ExpenseDraft::new(1000.0, "KAYNAK")
        .scope("PURE_IMALAT")
        .policy("ALWAYS_INCLUDED");
    draft.vendor_id = Some(vendor);
    let outcome =
        ExpenseService::create(&mut book, draft, &engine, &DocumentationPolicy::default())
            .unwrap();

    let changes = ExpenseChanges {
        hak_edis_rate: Some(0.10),
        ..ExpenseChanges::default()
    };
    let denied = ExpenseService::update(
        &mut book,
        outcome.expense_id,
        changes.clone(),
        Role::Operation,
        &engine,
    );
    assert!(matches!(denied, Err(CrmError::Forbidden(_))));

    let decision =
        ExpenseService::update(&mut book, outcome.expense_id, changes, Role::Owner, &engine)
            .unwrap();
    assert_eq!(decision.hak_edis_amount, 70.0);
}

#[test]
fn invalid_drafts_collect_every_problem() {
    let (mut book, _) = common::book_with_vendor("Usta Kaynak");
    let draft = ExpenseDraft {
        amount: Some(0.0),
        vendor_name: Some("Usta Kaynak".into()),
        ..ExpenseDraft::default()
    };
    let err = ExpenseService::create(
        &mut book,
        draft,
        &CommissionEngine::default(),
        &DocumentationPolicy::default(),
    )
    .unwrap_err();
    let CrmError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.len() >= 4);
    assert!(book.expenses.is_empty());
}

#[test]
fn advertising_expense_raises_documentation_reminder() {
    let (mut book, _) = common::book_with_vendor("Usta Kaynak");
    let draft = ExpenseDraft::new(300.0, "REKLAM")
        .scope("NON_IMALAT")
        .policy("ALWAYS_EXCLUDED")
        .vendor("Ajans Mavi");
    let outcome = ExpenseService::create(
        &mut book,
        draft,
        &CommissionEngine::default(),
        &DocumentationPolicy::default(),
    )
    .unwrap();
    assert!(outcome.documentation.required);
    assert!(book
        .open_reminders()
        .iter()
        .any(|r| r.kind == ReminderKind::MissingDocument));
    assert_eq!(VendorService::unassigned(&book).len(), 1);
}

#[test]
fn reports_filter_by_tag_and_date() {
    let (mut book, vendor) = common::book_with_vendor("Usta Kaynak");
    let engine = CommissionEngine::default();
    let docs = DocumentationPolicy::default();
    let mut weld = ExpenseDraft::new(1000.0, "KAYNAK")
        .scope("PURE_IMALAT")
        .policy("ALWAYS_INCLUDED")
        .on(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    weld.vendor_id = Some(vendor);
    ExpenseService::create(&mut book, weld, &engine, &docs).unwrap();
    ExpenseService::create(&mut book, conditional_draft(vendor), &engine, &docs).unwrap();

    let all = ReportService::exposure(&book, &ExpenseFilter::default(), &engine);
    assert_eq!(all.realized_hak_edis, 70.0);
    assert_eq!(all.conditional_exposure, 140.0);

    let glass_only = ExpenseFilter {
        primary_tag: Some("CAM".into()),
        ..ExpenseFilter::default()
    };
    let glass = ReportService::exposure(&book, &glass_only, &engine);
    assert_eq!(glass.realized_hak_edis, 0.0);
    assert_eq!(glass.potential_hak_edis, 140.0);

    let january = ExpenseFilter {
        to: NaiveDate::from_ymd_opt(2025, 1, 31),
        ..ExpenseFilter::default()
    };
    assert_eq!(
        ReportService::exposure(&book, &january, &engine).potential_hak_edis,
        70.0
    );

    let kpis = ReportService::kpis(&book, &engine);
    assert_eq!(kpis.total_spend, 3000.0);
    assert_eq!(kpis.conditional_count, 1);
}
