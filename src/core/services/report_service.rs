use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Expense, ExpenseBook, HakEdisPolicy, WorkScopeLevel};
use crate::engine::{round2, BatchEntry, CommissionEngine, Exposure, ProjectionReport};

use super::{Role, ServiceResult};

pub const DEFAULT_TREND_MONTHS: u32 = 12;
/// Months looked at by the rate check: the latest one plus the baseline before it.
pub const RATE_CHECK_MONTHS: u32 = 4;
/// Latest month's effective rate above this multiple of the baseline raises a warning.
pub const RATE_INCREASE_THRESHOLD: f64 = 1.2;

/// Narrows the expense set a report runs over. Empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub primary_tag: Option<String>,
    pub vendor_id: Option<Uuid>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if self.from.is_some_and(|from| expense.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| expense.date > to) {
            return false;
        }
        if let Some(tag) = &self.primary_tag {
            if !expense.primary_tag.trim().eq_ignore_ascii_case(tag.trim()) {
                return false;
            }
        }
        if let Some(vendor_id) = self.vendor_id {
            if expense.vendor_id != Some(vendor_id) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeBreakdown {
    pub work_scope_level: WorkScopeLevel,
    pub count: usize,
    pub total_amount: f64,
    pub hak_edis_total: f64,
    /// Spend on expenses that currently earn commission.
    pub eligible_amount: f64,
}

/// One calendar month of spend and commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`.
    pub month: String,
    pub expense_count: usize,
    pub total_amount: f64,
    pub hak_edis_total: f64,
    pub eligible_amount: f64,
    /// Commission as a percentage of all spend in the month.
    pub hak_edis_rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateWarning {
    pub month: String,
    pub last_month_rate: f64,
    pub previous_average: f64,
    pub increase_percent: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCheck {
    /// Newest month first.
    pub monthly_rates: Vec<(String, f64)>,
    pub warning: Option<RateWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedRow {
    pub primary_tag: String,
    pub work_scope_level: WorkScopeLevel,
    pub hak_edis_policy: HakEdisPolicy,
    pub expense_count: usize,
    pub total_amount: f64,
    pub total_hak_edis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedReport {
    pub rows: Vec<RealizedRow>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_spend: f64,
    pub exposure: Exposure,
    pub conditional_count: usize,
    pub pending_overrides: usize,
    pub open_reminders: usize,
}

pub struct ReportService;

impl ReportService {
    pub fn exposure(
        book: &ExpenseBook,
        filter: &ExpenseFilter,
        engine: &CommissionEngine,
    ) -> Exposure {
        let expenses = Self::filtered(book, filter);
        engine.calculate_exposure(&expenses, &book.overrides_map())
    }

    pub fn batch(
        book: &ExpenseBook,
        filter: &ExpenseFilter,
        engine: &CommissionEngine,
    ) -> Vec<BatchEntry> {
        let expenses = Self::filtered(book, filter);
        engine.calculate_batch(&expenses, &book.overrides_map())
    }

    /// One row per work scope level, including levels with no expenses.
    pub fn by_work_scope(
        book: &ExpenseBook,
        filter: &ExpenseFilter,
        engine: &CommissionEngine,
    ) -> Vec<ScopeBreakdown> {
        let expenses = Self::filtered(book, filter);
        let decisions = engine.calculate_batch(&expenses, &book.overrides_map());

        WorkScopeLevel::ALL
            .iter()
            .map(|level| {
                let mut row = ScopeBreakdown {
                    work_scope_level: *level,
                    count: 0,
                    total_amount: 0.0,
                    hak_edis_total: 0.0,
                    eligible_amount: 0.0,
                };
                for (expense, entry) in expenses.iter().zip(&decisions) {
                    if expense.work_scope_level != *level {
                        continue;
                    }
                    row.count += 1;
                    row.total_amount += expense.amount;
                    if entry.decision.is_eligible {
                        row.hak_edis_total += entry.decision.hak_edis_amount;
                        row.eligible_amount += expense.amount;
                    }
                }
                row.total_amount = round2(row.total_amount);
                row.hak_edis_total = round2(row.hak_edis_total);
                row.eligible_amount = round2(row.eligible_amount);
                row
            })
            .collect()
    }

    /// Month-by-month totals from the first day of the month `months` before `today`,
    /// oldest month first. Months without expenses are skipped.
    pub fn trend(
        book: &ExpenseBook,
        today: NaiveDate,
        months: u32,
        engine: &CommissionEngine,
    ) -> Vec<MonthlyTrend> {
        let start = today
            .checked_sub_months(Months::new(months))
            .and_then(|date| date.with_day(1));
        let expenses: Vec<Expense> = book
            .expenses
            .iter()
            .filter(|expense| start.map_or(true, |start| expense.date >= start))
            .cloned()
            .collect();
        let decisions = engine.calculate_batch(&expenses, &book.overrides_map());

        let mut months: BTreeMap<String, MonthlyTrend> = BTreeMap::new();
        for (expense, entry) in expenses.iter().zip(&decisions) {
            let key = expense.date.format("%Y-%m").to_string();
            let row = months.entry(key.clone()).or_insert_with(|| MonthlyTrend {
                month: key,
                expense_count: 0,
                total_amount: 0.0,
                hak_edis_total: 0.0,
                eligible_amount: 0.0,
                hak_edis_rate_percent: 0.0,
            });
            row.expense_count += 1;
            row.total_amount += expense.amount;
            if entry.decision.is_eligible {
                row.hak_edis_total += entry.decision.hak_edis_amount;
                row.eligible_amount += expense.amount;
            }
        }

        months
            .into_values()
            .map(|mut row| {
                row.hak_edis_rate_percent = if row.total_amount > 0.0 {
                    round2(row.hak_edis_total / row.total_amount * 100.0)
                } else {
                    0.0
                };
                row.total_amount = round2(row.total_amount);
                row.hak_edis_total = round2(row.hak_edis_total);
                row.eligible_amount = round2(row.eligible_amount);
                row
            })
            .collect()
    }

    /// Flags an unusual rise of the effective commission rate: the latest month against
    /// the average of the months before it. Owner only.
    pub fn rate_check(
        book: &ExpenseBook,
        today: NaiveDate,
        role: Role,
        engine: &CommissionEngine,
    ) -> ServiceResult<RateCheck> {
        role.require_owner("check the hak ediş rate")?;
        let monthly_rates: Vec<(String, f64)> =
            Self::trend(book, today, RATE_CHECK_MONTHS, engine)
                .into_iter()
                .rev()
                .map(|row| (row.month, row.hak_edis_rate_percent))
                .collect();

        let warning = match monthly_rates.split_first() {
            Some(((month, last), previous)) if !previous.is_empty() => {
                let average =
                    previous.iter().map(|(_, rate)| rate).sum::<f64>() / previous.len() as f64;
                (average > 0.0 && *last > average * RATE_INCREASE_THRESHOLD).then(|| {
                    RateWarning {
                        month: month.clone(),
                        last_month_rate: *last,
                        previous_average: round2(average),
                        increase_percent: round2((last - average) / average * 100.0),
                        message: format!(
                            "Hak ediş rate increased from {average:.2}% average to {last:.2}%"
                        ),
                    }
                })
            }
            _ => None,
        };
        if let Some(warning) = &warning {
            tracing::warn!(month = %warning.month, increase = warning.increase_percent, "hak ediş rate jump");
        }
        Ok(RateCheck {
            monthly_rates,
            warning,
        })
    }

    /// Commission already earned, grouped by tag, scope and policy; largest first.
    pub fn realized(
        book: &ExpenseBook,
        filter: &ExpenseFilter,
        engine: &CommissionEngine,
    ) -> RealizedReport {
        let expenses = Self::filtered(book, filter);
        let decisions = engine.calculate_batch(&expenses, &book.overrides_map());

        let mut rows: Vec<RealizedRow> = Vec::new();
        for (expense, entry) in expenses.iter().zip(&decisions) {
            if !entry.decision.is_eligible {
                continue;
            }
            let position = rows.iter().position(|row| {
                row.primary_tag == expense.primary_tag
                    && row.work_scope_level == expense.work_scope_level
                    && row.hak_edis_policy == expense.hak_edis_policy
            });
            let row = match position {
                Some(idx) => &mut rows[idx],
                None => {
                    rows.push(RealizedRow {
                        primary_tag: expense.primary_tag.clone(),
                        work_scope_level: expense.work_scope_level,
                        hak_edis_policy: expense.hak_edis_policy,
                        expense_count: 0,
                        total_amount: 0.0,
                        total_hak_edis: 0.0,
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            row.expense_count += 1;
            row.total_amount += expense.amount;
            row.total_hak_edis += entry.decision.hak_edis_amount;
        }

        for row in &mut rows {
            row.total_amount = round2(row.total_amount);
            row.total_hak_edis = round2(row.total_hak_edis);
        }
        rows.sort_by(|a, b| {
            b.total_hak_edis
                .total_cmp(&a.total_hak_edis)
                .then_with(|| a.primary_tag.cmp(&b.primary_tag))
        });
        let total = round2(rows.iter().map(|row| row.total_hak_edis).sum());
        RealizedReport { rows, total }
    }

    pub fn kpis(book: &ExpenseBook, engine: &CommissionEngine) -> Kpis {
        let overrides = book.overrides_map();
        let conditional_count = engine
            .calculate_batch(&book.expenses, &overrides)
            .iter()
            .filter(|entry| entry.decision.requires_approval)
            .count();
        Kpis {
            total_spend: round2(book.expenses.iter().map(|e| e.amount).sum()),
            exposure: engine.calculate_exposure(&book.expenses, &overrides),
            conditional_count,
            pending_overrides: book.overrides.iter().filter(|r| r.is_pending()).count(),
            open_reminders: book.reminders.iter().filter(|r| !r.resolved).count(),
        }
    }

    pub fn projection(book: &ExpenseBook, engine: &CommissionEngine) -> ProjectionReport {
        engine.projection(&book.expenses, &book.overrides_map())
    }

    fn filtered(book: &ExpenseBook, filter: &ExpenseFilter) -> Vec<Expense> {
        book.expenses
            .iter()
            .filter(|expense| filter.matches(expense))
            .cloned()
            .collect()
    }
}
