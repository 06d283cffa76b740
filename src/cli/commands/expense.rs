use std::fmt::Display;
use std::str::FromStr;

use crate::cli::commands::CommandDefinition;
use crate::cli::context::{
    parse_amount, parse_date, resolve_id, short_id, Args, CommandError, CommandResult,
    ShellContext,
};
use crate::cli::output;
use crate::core::services::{ExpenseService, VendorService};
use crate::domain::common::normalize_name;
use crate::domain::{
    Displayable, ExpenseBook, ExpenseChanges, ExpenseDraft, HakEdisPolicy, OverrideState,
    Vendor, WorkScopeLevel,
};
use crate::engine::projection::category_default;
use crate::engine::Decision;

const EXPENSE_ADD_USAGE: &str =
    "expense-add <amount> <tag> <vendor> [--scope S] [--policy P] [--date YYYY-MM-DD] [--note text]";
const EXPENSE_EDIT_USAGE: &str = "expense-edit <expense-id> [--amount A] [--tag T] [--vendor V] \
     [--scope S] [--policy P] [--date YYYY-MM-DD] [--note text] [--rate R]";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "vendor-add",
            "Register a vendor",
            "vendor-add <name> [--docs] [--note text]",
            cmd_vendor_add,
        ),
        CommandDefinition::new(
            "vendors",
            "List vendors and expenses not attributed to any",
            "vendors",
            cmd_vendors,
        ),
        CommandDefinition::new(
            "expense-add",
            "Record an expense; scope and policy default from the category",
            EXPENSE_ADD_USAGE,
            cmd_expense_add,
        ),
        CommandDefinition::new(
            "expense-edit",
            "Change an expense and recompute its hak ediş",
            EXPENSE_EDIT_USAGE,
            cmd_expense_edit,
        ),
        CommandDefinition::new(
            "expense-remove",
            "Delete an expense with its overrides and reminders",
            "expense-remove <expense-id>",
            cmd_expense_remove,
        ),
        CommandDefinition::new(
            "expense-list",
            "List expenses, newest first",
            "expense-list",
            cmd_expense_list,
        ),
        CommandDefinition::new(
            "preview",
            "Show the hak ediş decision without saving",
            "preview <amount> <scope> <policy> [--approved]",
            cmd_preview,
        ),
    ]
}

fn cmd_vendor_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["note"])?;
    if args.positional.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: vendor-add <name> [--docs] [--note text]".into(),
        ));
    }
    let mut vendor = Vendor::new(args.positional.join(" "));
    vendor.requires_documentation = args.has("docs");
    vendor.notes = args.value("note").map(str::to_string);
    let name = vendor.name.clone();
    VendorService::add(context.book_mut()?, vendor)?;
    output::success(format!("Vendor `{}` added.", name.trim()));
    Ok(())
}

fn cmd_vendors(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let book = context.book()?;
    let rows: Vec<Vec<String>> = VendorService::list(book)
        .into_iter()
        .map(|vendor| {
            let count = VendorService::expenses_for_vendor(book, vendor.id)
                .map(|expenses| expenses.len())
                .unwrap_or_default();
            vec![
                short_id(vendor.id),
                vendor.display_label(),
                count.to_string(),
            ]
        })
        .collect();
    output::table(&["Id", "Vendor", "Expenses"], &rows);

    let unassigned = VendorService::unassigned(book);
    if !unassigned.is_empty() {
        output::warning(format!("{} expense(s) not attributed to a vendor:", unassigned.len()));
        for expense in unassigned {
            let suggestion = VendorService::suggest(book, &expense.vendor_name)
                .first()
                .map(|name| format!(" (did you mean `{name}`?)"))
                .unwrap_or_default();
            output::info(format!(
                "  {} {}{}",
                short_id(expense.id),
                expense.display_label(),
                suggestion
            ));
        }
    }
    Ok(())
}

fn cmd_expense_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(args, &["scope", "policy", "date", "note"])?;
    let amount = parse_amount(args.required(0, EXPENSE_ADD_USAGE)?)?;
    let tag = args.required(1, EXPENSE_ADD_USAGE)?.to_uppercase();
    let vendor = args.positional.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();

    let defaults = category_default(&tag);
    let scope = args
        .value("scope")
        .map(canonical::<WorkScopeLevel>)
        .or_else(|| defaults.map(|d| d.work_scope_level.to_string()));
    let policy = args
        .value("policy")
        .map(canonical::<HakEdisPolicy>)
        .or_else(|| defaults.map(|d| d.hak_edis_policy.to_string()));

    let mut draft = ExpenseDraft::new(amount, tag);
    draft.work_scope_level = scope;
    draft.hak_edis_policy = policy;
    draft.currency = Some(context.currency().to_string());
    draft.description = args.value("note").map(str::to_string);
    if let Some(raw) = args.value("date") {
        draft.date = Some(parse_date(raw)?);
    }
    let linked = linked_vendor(context.book()?, &vendor);
    draft.vendor_id = linked;
    if linked.is_none() && !vendor.trim().is_empty() {
        draft.vendor_name = Some(vendor);
    }

    let engine = context.engine();
    let docs = context.documentation_policy();
    let currency = context.currency().to_string();
    let outcome = ExpenseService::create(context.book_mut()?, draft, &engine, &docs)?;
    output::success(format!("Expense {} recorded.", short_id(outcome.expense_id)));
    print_decision(&outcome.decision, &currency);
    if let Some(reason) = outcome.documentation.reason {
        output::warning(format!("Documentation required: {reason}"));
    }
    Ok(())
}

fn cmd_expense_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = Args::parse(
        args,
        &["amount", "tag", "vendor", "scope", "policy", "date", "note", "rate"],
    )?;
    let id = expense_id(context, args.required(0, EXPENSE_EDIT_USAGE)?)?;

    let mut changes = ExpenseChanges {
        amount: args.value("amount").map(parse_amount).transpose()?,
        date: args.value("date").map(parse_date).transpose()?,
        primary_tag: args.value("tag").map(str::to_uppercase),
        work_scope_level: args.value("scope").map(canonical::<WorkScopeLevel>),
        hak_edis_policy: args.value("policy").map(canonical::<HakEdisPolicy>),
        description: args.value("note").map(str::to_string),
        hak_edis_rate: args.value("rate").map(parse_amount).transpose()?,
        ..ExpenseChanges::default()
    };
    if let Some(vendor) = args.value("vendor") {
        changes.vendor_id = linked_vendor(context.book()?, vendor);
        changes.vendor_name = Some(vendor.to_string());
    }
    if changes == ExpenseChanges::default() {
        return Err(CommandError::InvalidArguments(format!(
            "nothing to change; usage: {EXPENSE_EDIT_USAGE}"
        )));
    }

    let had_pending = context.book()?.pending_override(id).is_some();
    let (engine, role) = (context.engine(), context.role);
    let currency = context.currency().to_string();
    let decision = ExpenseService::update(context.book_mut()?, id, changes, role, &engine)?;
    output::success(format!("Expense {} updated.", short_id(id)));
    print_decision(&decision, &currency);
    if had_pending && context.book()?.pending_override(id).is_none() {
        output::warning("Pending override request closed; the expense no longer accepts one.");
    }
    Ok(())
}

fn cmd_expense_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(needle) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: expense-remove <expense-id>".into(),
        ));
    };
    let id = expense_id(context, needle)?;
    ExpenseService::remove(context.book_mut()?, id)?;
    output::success(format!("Expense {} removed.", short_id(id)));
    Ok(())
}

fn cmd_expense_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let book = context.book()?;
    let expenses = ExpenseService::list(book);
    if expenses.is_empty() {
        output::info("No expenses recorded.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = expenses
        .iter()
        .map(|expense| {
            vec![
                short_id(expense.id),
                expense.date.to_string(),
                expense.vendor_name.clone(),
                expense.primary_tag.clone(),
                expense.work_scope_level.to_string(),
                expense.hak_edis_policy.to_string(),
                output::money(expense.amount, &expense.currency),
                if expense.is_hak_edis_eligible {
                    output::money(expense.hak_edis_amount, &expense.currency)
                } else {
                    "-".into()
                },
            ]
        })
        .collect();
    output::table(
        &["Id", "Date", "Vendor", "Tag", "Scope", "Policy", "Amount", "Hak ediş"],
        &rows,
    );
    Ok(())
}

fn cmd_preview(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "preview <amount> <scope> <policy> [--approved]";
    let args = Args::parse(args, &[])?;
    let mut draft = ExpenseDraft::new(parse_amount(args.required(0, USAGE)?)?, "PREVIEW");
    draft.work_scope_level = Some(canonical::<WorkScopeLevel>(args.required(1, USAGE)?));
    draft.hak_edis_policy = Some(canonical::<HakEdisPolicy>(args.required(2, USAGE)?));
    let state = if args.has("approved") {
        OverrideState::Approved { eligibility: true }
    } else {
        OverrideState::None
    };
    let decision = ExpenseService::preview(&draft, state, &context.engine());
    print_decision(&decision, context.currency());
    Ok(())
}

pub(crate) fn print_decision(decision: &Decision, currency: &str) {
    if let Some(error) = &decision.error {
        output::error(format!("{}: {}", decision.reason, error));
        return;
    }
    if decision.is_eligible {
        output::info(format!(
            "Hak ediş: {} ({})",
            output::money(decision.hak_edis_amount, currency),
            decision.reason
        ));
    } else if decision.requires_approval {
        output::warning(format!(
            "Pending owner approval ({}); potential {}",
            decision.reason,
            output::money(decision.potential_amount.unwrap_or_default(), currency)
        ));
    } else {
        output::info(format!("No hak ediş ({})", decision.reason));
    }
    output::hint(&decision.details);
}

/// Shell input may use any case; unknown values pass through so validation reports them.
fn canonical<T>(raw: &str) -> String
where
    T: FromStr + Display,
{
    raw.parse::<T>()
        .map(|value| value.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn linked_vendor(book: &ExpenseBook, name: &str) -> Option<uuid::Uuid> {
    let key = normalize_name(name);
    book.vendors
        .iter()
        .find(|vendor| vendor.name_key() == key)
        .map(|vendor| vendor.id)
}

/// Resolves an expense id prefix in the current book.
pub(crate) fn expense_id(context: &ShellContext, needle: &str) -> Result<uuid::Uuid, CommandError> {
    let book = context.book()?;
    resolve_id("expense", &book.expenses, needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_classification_input_is_canonicalized() {
        assert_eq!(canonical::<WorkScopeLevel>("pure_imalat"), "PURE_IMALAT");
        assert_eq!(canonical::<HakEdisPolicy>(" conditional "), "CONDITIONAL");
        assert_eq!(canonical::<HakEdisPolicy>("maybe"), "maybe");
    }
}
