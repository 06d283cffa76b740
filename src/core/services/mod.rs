pub mod expense_service;
pub mod override_service;
pub mod reminder_service;
pub mod report_service;
pub mod vendor_service;

pub use expense_service::{ExpenseOutcome, ExpenseService};
pub use override_service::{OverrideService, PendingOverrides};
pub use reminder_service::ReminderService;
pub use report_service::{
    ExpenseFilter, Kpis, MonthlyTrend, RateCheck, RateWarning, RealizedReport, RealizedRow,
    ReportService, ScopeBreakdown,
};
pub use vendor_service::VendorService;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::CrmError;

pub type ServiceResult<T> = Result<T, CrmError>;

/// Who is acting. Owners approve overrides; operations staff record expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Operation,
}

impl Role {
    pub fn require_owner(self, action: &str) -> ServiceResult<()> {
        match self {
            Role::Owner => Ok(()),
            Role::Operation => Err(CrmError::Forbidden(format!(
                "only the owner may {action}"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("OWNER"),
            Role::Operation => f.write_str("OPERATION"),
        }
    }
}

impl FromStr for Role {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "OPERATION" => Ok(Role::Operation),
            other => Err(CrmError::Validation(vec![format!("Invalid role: {other}")])),
        }
    }
}
