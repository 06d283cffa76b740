//! Exposure, trend, projection, reminder and audit reports.

use chrono::Utc;

use crate::cli::commands::CommandDefinition;
use crate::cli::context::{
    parse_date, resolve_id, short_id, Args, CommandError, CommandResult, ShellContext,
};
use crate::cli::output;
use crate::core::services::report_service::DEFAULT_TREND_MONTHS;
use crate::core::services::{ExpenseFilter, ReminderService, ReportService};
use crate::engine::Exposure;

const DEFAULT_AUDIT_LIMIT: usize = 20;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "exposure",
            "Realized, potential and conditional hak ediş",
            "exposure [--from YYYY-MM-DD] [--to YYYY-MM-DD] [--tag TAG]",
            cmd_exposure,
        ),
        CommandDefinition::new(
            "trend",
            "Monthly spend, hak ediş and effective rate",
            "trend [--months N]",
            cmd_trend,
        ),
        CommandDefinition::new(
            "rate-check",
            "Warn when last month's effective rate jumped (owner only)",
            "rate-check",
            cmd_rate_check,
        ),
        CommandDefinition::new(
            "realized",
            "Earned hak ediş by tag, scope and policy",
            "realized [--from YYYY-MM-DD] [--to YYYY-MM-DD] [--tag TAG]",
            cmd_realized,
        ),
        CommandDefinition::new(
            "projection",
            "Spend and hak ediş per catalog category",
            "projection",
            cmd_projection,
        ),
        CommandDefinition::new(
            "reminders",
            "Open follow-ups, most urgent first",
            "reminders",
            cmd_reminders,
        ),
        CommandDefinition::new(
            "reminder-resolve",
            "Mark a reminder handled",
            "reminder-resolve <reminder-id> [notes]",
            cmd_reminder_resolve,
        ),
        CommandDefinition::new(
            "audit",
            "Recent changes to the book, newest first",
            "audit [--limit N]",
            cmd_audit,
        ),
    ]
}

fn filter_from(args: &Args<'_>) -> Result<ExpenseFilter, CommandError> {
    Ok(ExpenseFilter {
        from: args.value("from").map(parse_date).transpose()?,
        to: args.value("to").map(parse_date).transpose()?,
        primary_tag: args.value("tag").map(str::to_string),
        vendor_id: None,
    })
}

fn parse_count(raw: Option<&str>, flag: &str, default: usize) -> Result<usize, CommandError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                CommandError::InvalidArguments(format!("--{flag} needs a positive number"))
            }),
    }
}

fn cmd_exposure(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["from", "to", "tag"])?;
    let filter = filter_from(&args)?;
    let engine = context.engine();
    let book = context.book()?;
    let exposure = ReportService::exposure(book, &filter, &engine);
    output::section("Hak ediş exposure");
    output::info(render_exposure(&exposure, context.currency()));

    let scopes = ReportService::by_work_scope(book, &filter, &engine);
    let rows: Vec<Vec<String>> = scopes
        .iter()
        .filter(|row| row.count > 0)
        .map(|row| {
            vec![
                row.work_scope_level.to_string(),
                row.count.to_string(),
                output::money(row.total_amount, context.currency()),
                output::money(row.hak_edis_total, context.currency()),
            ]
        })
        .collect();
    if !rows.is_empty() {
        output::table(&["Scope", "Count", "Spent", "Hak ediş"], &rows);
    }
    Ok(())
}

fn render_exposure(exposure: &Exposure, currency: &str) -> String {
    [
        ("Realized", exposure.realized_hak_edis),
        ("Potential", exposure.potential_hak_edis),
        ("Conditional", exposure.conditional_exposure),
        ("Remaining", exposure.remaining_potential),
    ]
    .iter()
    .map(|(label, amount)| format!("{:<12}: {}", label, output::money(*amount, currency)))
    .collect::<Vec<_>>()
    .join("\n")
}

fn cmd_trend(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["months"])?;
    let months = parse_count(args.value("months"), "months", DEFAULT_TREND_MONTHS as usize)?;
    let engine = context.engine();
    let book = context.book()?;
    let currency = context.currency();
    let today = Utc::now().date_naive();
    let rows: Vec<Vec<String>> = ReportService::trend(book, today, months as u32, &engine)
        .iter()
        .map(|row| {
            vec![
                row.month.clone(),
                row.expense_count.to_string(),
                output::money(row.total_amount, currency),
                output::money(row.eligible_amount, currency),
                output::money(row.hak_edis_total, currency),
                format!("{:.2}%", row.hak_edis_rate_percent),
            ]
        })
        .collect();
    if rows.is_empty() {
        output::info(format!("No expenses in the last {months} month(s)."));
        return Ok(());
    }
    output::section("Hak ediş trend");
    output::table(
        &["Month", "Count", "Spent", "Eligible", "Hak ediş", "Rate"],
        &rows,
    );
    Ok(())
}

fn cmd_rate_check(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let (engine, role) = (context.engine(), context.role);
    let book = context.book()?;
    let check = ReportService::rate_check(book, Utc::now().date_naive(), role, &engine)?;
    for (month, rate) in &check.monthly_rates {
        output::info(format!("  {month}  {rate:.2}%"));
    }
    match check.warning {
        Some(warning) => output::warning(format!(
            "{} (+{:.2}%)",
            warning.message, warning.increase_percent
        )),
        None => output::success("No unusual change in the effective hak ediş rate."),
    }
    Ok(())
}

fn cmd_realized(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["from", "to", "tag"])?;
    let filter = filter_from(&args)?;
    let engine = context.engine();
    let book = context.book()?;
    let currency = context.currency();
    let report = ReportService::realized(book, &filter, &engine);
    if report.rows.is_empty() {
        output::info("No hak ediş realized yet.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                row.primary_tag.clone(),
                row.work_scope_level.to_string(),
                row.hak_edis_policy.to_string(),
                row.expense_count.to_string(),
                output::money(row.total_amount, currency),
                output::money(row.total_hak_edis, currency),
            ]
        })
        .collect();
    output::section("Realized hak ediş");
    output::table(&["Tag", "Scope", "Policy", "Count", "Spent", "Hak ediş"], &rows);
    output::info(format!("Total realized {}", output::money(report.total, currency)));
    Ok(())
}

fn cmd_projection(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let engine = context.engine();
    let book = context.book()?;
    let currency = context.currency();
    let report = ReportService::projection(book, &engine);
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                row.tag.clone(),
                row.work_scope_level.to_string(),
                row.hak_edis_policy.to_string(),
                row.expense_count.to_string(),
                output::money(row.total_spent, currency),
                output::money(row.paid_hak_edis, currency),
                output::money(row.pending_potential, currency),
            ]
        })
        .collect();
    output::section("Category projection");
    output::table(
        &["Tag", "Scope", "Policy", "Count", "Spent", "Paid", "Pending"],
        &rows,
    );
    output::info(format!(
        "Total spent {}, paid {}, pending {}, estimated exposure {}",
        output::money(report.totals.total_spent, currency),
        output::money(report.totals.paid_hak_edis, currency),
        output::money(report.totals.pending_potential, currency),
        output::money(report.totals.total_exposure, currency),
    ));
    Ok(())
}

fn cmd_reminders(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let book = context.book()?;
    let open = ReminderService::open(book);
    if open.is_empty() {
        output::info("No open reminders.");
        return Ok(());
    }
    for reminder in open {
        let expense = reminder
            .expense_id
            .map(|id| format!(" expense {}", short_id(id)))
            .unwrap_or_default();
        output::info(format!(
            "{} [{}]{} {}: {}",
            short_id(reminder.id),
            reminder.severity,
            expense,
            reminder.title,
            reminder.message
        ));
    }
    let counts: Vec<String> = ReminderService::counts_by_kind(book)
        .into_iter()
        .map(|(kind, count)| format!("{kind} {count}"))
        .collect();
    output::hint(counts.join(", "));
    Ok(())
}

fn cmd_reminder_resolve(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((needle, notes)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(
            "usage: reminder-resolve <reminder-id> [notes]".into(),
        ));
    };
    let id = resolve_id("reminder", &context.book()?.reminders, needle)?;
    let notes = (!notes.is_empty()).then(|| notes.join(" "));
    let role = context.role;
    ReminderService::resolve(context.book_mut()?, id, role, notes)?;
    output::success(format!("Reminder {} resolved.", short_id(id)));
    Ok(())
}

fn cmd_audit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["limit"])?;
    let limit = parse_count(args.value("limit"), "limit", DEFAULT_AUDIT_LIMIT)?;
    let book = context.book()?;
    let rows: Vec<Vec<String>> = book
        .audit_trail(limit)
        .into_iter()
        .map(|entry| {
            vec![
                entry.at.format("%Y-%m-%d %H:%M").to_string(),
                entry.action.to_string(),
                short_id(entry.entity_id),
                entry.actor.clone().unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    if rows.is_empty() {
        output::info("No changes recorded.");
        return Ok(());
    }
    output::table(&["When", "Action", "Record", "By"], &rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposure_block_layout() {
        let exposure = Exposure {
            realized_hak_edis: 70.0,
            potential_hak_edis: 210.0,
            conditional_exposure: 140.0,
            remaining_potential: 140.0,
        };
        insta::assert_snapshot!(render_exposure(&exposure, "TRY"), @r###"
        Realized    : 70.00 TRY
        Potential   : 210.00 TRY
        Conditional : 140.00 TRY
        Remaining   : 140.00 TRY
        "###);
    }
}
