use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::classification::{HakEdisPolicy, WorkScopeLevel};
use crate::domain::common::{Displayable, Identifiable};

pub const DEFAULT_CURRENCY: &str = "TRY";

/// A recorded expense together with its persisted hak ediş outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Uuid>,
    pub vendor_name: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub primary_tag: String,
    pub work_scope_level: WorkScopeLevel,
    pub hak_edis_policy: HakEdisPolicy,
    #[serde(default)]
    pub is_hak_edis_eligible: bool,
    #[serde(default)]
    pub hak_edis_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_id: Option<Uuid>,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        vendor_name: impl Into<String>,
        amount: f64,
        primary_tag: impl Into<String>,
        work_scope_level: WorkScopeLevel,
        hak_edis_policy: HakEdisPolicy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            vendor_id: None,
            vendor_name: vendor_name.into(),
            amount,
            currency: DEFAULT_CURRENCY.into(),
            description: None,
            primary_tag: primary_tag.into(),
            work_scope_level,
            hak_edis_policy,
            is_hak_edis_eligible: false,
            hak_edis_amount: 0.0,
            override_id: None,
        }
    }

    pub fn with_vendor(mut self, vendor_id: Uuid) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    /// Only mixed material and labor work under a CONDITIONAL policy can be overridden.
    pub fn accepts_override(&self) -> bool {
        self.work_scope_level == WorkScopeLevel::MalzemePlusImalat
            && self.hak_edis_policy == HakEdisPolicy::Conditional
    }

    /// Stores a freshly computed eligibility outcome on the record.
    pub fn apply_outcome(&mut self, is_eligible: bool, amount: f64) {
        self.is_hak_edis_eligible = is_eligible;
        self.hak_edis_amount = if is_eligible { amount } else { 0.0 };
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!(
            "{} {} {:.2} {} [{}]",
            self.date, self.vendor_name, self.amount, self.currency, self.primary_tag
        )
    }
}

/// Unvalidated expense input as it arrives from a form, import row or CLI line.
///
/// Classification fields stay raw strings so the validator can tell a missing value
/// from an unrecognized one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpenseDraft {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub vendor_id: Option<Uuid>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_tag: Option<String>,
    #[serde(default)]
    pub work_scope_level: Option<String>,
    #[serde(default)]
    pub hak_edis_policy: Option<String>,
}

impl ExpenseDraft {
    pub fn new(amount: f64, primary_tag: impl Into<String>) -> Self {
        Self {
            amount: Some(amount),
            primary_tag: Some(primary_tag.into()),
            ..Self::default()
        }
    }

    pub fn scope(mut self, level: impl Into<String>) -> Self {
        self.work_scope_level = Some(level.into());
        self
    }

    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.hak_edis_policy = Some(policy.into());
        self
    }

    pub fn vendor(mut self, name: impl Into<String>) -> Self {
        self.vendor_name = Some(name.into());
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Returns the trimmed value of an optional text field, `None` when blank.
    pub fn text(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl From<&Expense> for ExpenseDraft {
    fn from(expense: &Expense) -> Self {
        Self {
            date: Some(expense.date),
            vendor_id: expense.vendor_id,
            vendor_name: Some(expense.vendor_name.clone()),
            amount: Some(expense.amount),
            currency: Some(expense.currency.clone()),
            description: expense.description.clone(),
            primary_tag: Some(expense.primary_tag.clone()),
            work_scope_level: Some(expense.work_scope_level.to_string()),
            hak_edis_policy: Some(expense.hak_edis_policy.to_string()),
        }
    }
}

/// Partial update applied to an existing expense; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpenseChanges {
    pub date: Option<NaiveDate>,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub primary_tag: Option<String>,
    pub work_scope_level: Option<String>,
    pub hak_edis_policy: Option<String>,
    /// Attempted rate change; only the owner may send one.
    pub hak_edis_rate: Option<f64>,
}

impl ExpenseChanges {
    /// Overlays these changes on the stored expense, producing a draft to revalidate.
    pub fn merge_into(&self, existing: &Expense) -> ExpenseDraft {
        let mut draft = ExpenseDraft::from(existing);
        if let Some(date) = self.date {
            draft.date = Some(date);
        }
        if self.vendor_id.is_some() {
            draft.vendor_id = self.vendor_id;
        } else if ExpenseDraft::text(&self.vendor_name).is_some() {
            // A new name without a vendor record detaches the old one.
            draft.vendor_id = None;
        }
        overlay(&mut draft.vendor_name, &self.vendor_name);
        if let Some(amount) = self.amount {
            draft.amount = Some(amount);
        }
        overlay(&mut draft.currency, &self.currency);
        if self.description.is_some() {
            draft.description = self.description.clone();
        }
        overlay(&mut draft.primary_tag, &self.primary_tag);
        overlay(&mut draft.work_scope_level, &self.work_scope_level);
        overlay(&mut draft.hak_edis_policy, &self.hak_edis_policy);
        draft
    }
}

fn overlay(target: &mut Option<String>, change: &Option<String>) {
    if let Some(value) = ExpenseDraft::text(change) {
        *target = Some(value.to_string());
    }
}
