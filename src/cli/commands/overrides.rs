//! Override request and approval commands.

use crate::cli::commands::{expense, CommandDefinition};
use crate::cli::context::{resolve_id, short_id, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::core::services::OverrideService;
use crate::domain::OverrideStatus;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "override-request",
            "Ask the owner to include a MALZEME_PLUS_IMALAT + CONDITIONAL expense",
            "override-request <expense-id> <reason>",
            cmd_request,
        ),
        CommandDefinition::new(
            "override-approve",
            "Approve a pending request (owner only)",
            "override-approve <override-id> [notes]",
            cmd_approve,
        ),
        CommandDefinition::new(
            "override-reject",
            "Reject a pending request (owner only)",
            "override-reject <override-id> <reason>",
            cmd_reject,
        ),
        CommandDefinition::new(
            "overrides",
            "List override requests",
            "overrides [pending|approved|rejected]",
            cmd_list,
        ),
    ]
}

fn cmd_request(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((needle, reason)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(
            "usage: override-request <expense-id> <reason>".into(),
        ));
    };
    let expense_id = expense::expense_id(context, needle)?;
    let engine = context.engine();
    let override_id =
        OverrideService::request(context.book_mut()?, expense_id, &reason.join(" "), &engine)?;
    output::success(format!(
        "Override {} requested for expense {}.",
        short_id(override_id),
        short_id(expense_id)
    ));
    Ok(())
}

fn cmd_approve(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((needle, notes)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(
            "usage: override-approve <override-id> [notes]".into(),
        ));
    };
    let override_id = override_id(context, needle)?;
    let notes = (!notes.is_empty()).then(|| notes.join(" "));
    let (engine, role) = (context.engine(), context.role);
    let decision =
        OverrideService::approve(context.book_mut()?, override_id, role, notes, &engine)?;
    output::success(format!("Override {} approved.", short_id(override_id)));
    expense::print_decision(&decision, context.currency());
    Ok(())
}

fn cmd_reject(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((needle, notes)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(
            "usage: override-reject <override-id> <reason>".into(),
        ));
    };
    let override_id = override_id(context, needle)?;
    let (engine, role) = (context.engine(), context.role);
    OverrideService::reject(
        context.book_mut()?,
        override_id,
        role,
        &notes.join(" "),
        &engine,
    )?;
    output::success(format!("Override {} rejected.", short_id(override_id)));
    Ok(())
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let status = match args.first().map(|s| s.to_lowercase()).as_deref() {
        None => None,
        Some("pending") => Some(OverrideStatus::Pending),
        Some("approved") => Some(OverrideStatus::Approved),
        Some("rejected") => Some(OverrideStatus::Rejected),
        Some(other) => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown status `{other}`; use pending, approved or rejected"
            )))
        }
    };
    let engine = context.engine();
    let book = context.book()?;
    let currency = context.currency();
    let records = OverrideService::list(book, status);
    if records.is_empty() {
        output::info("No override requests.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            vec![
                short_id(record.id),
                short_id(record.expense_id),
                record.status.label().to_string(),
                output::money(record.requested_hak_edis_amount, currency),
                record.requested_at.format("%Y-%m-%d").to_string(),
                record.reason.clone(),
            ]
        })
        .collect();
    output::table(
        &["Id", "Expense", "Status", "Potential", "Requested", "Reason"],
        &rows,
    );

    let pending = OverrideService::pending(book, &engine);
    if pending.count > 0 {
        output::info(format!(
            "{} pending, {} awaiting approval.",
            pending.count,
            output::money(pending.total_potential_exposure, currency)
        ));
    }
    Ok(())
}

fn override_id(context: &ShellContext, needle: &str) -> Result<uuid::Uuid, CommandError> {
    let book = context.book()?;
    resolve_id("override", &book.overrides, needle)
}
