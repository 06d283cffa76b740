//! Creating, opening, saving and backing up expense books.

use crate::cli::commands::CommandDefinition;
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::core::services::ExpenseService;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("new", "Start a new expense book", "new <name>", cmd_new),
        CommandDefinition::new(
            "load",
            "Open a saved book by name (no name lists books)",
            "load [name]",
            cmd_load,
        ),
        CommandDefinition::new(
            "save",
            "Save the current book, optionally under a new name",
            "save [name]",
            cmd_save,
        ),
        CommandDefinition::new(
            "backup",
            "Write a timestamped backup of the current book",
            "backup [note]",
            cmd_backup,
        ),
        CommandDefinition::new(
            "backups",
            "List backups of the current book",
            "backups",
            cmd_backups,
        ),
        CommandDefinition::new(
            "restore",
            "Restore the current book from a backup file",
            "restore <backup-file>",
            cmd_restore,
        ),
    ]
}

fn cmd_new(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = args.join(" ");
    if name.trim().is_empty() {
        return Err(CommandError::InvalidArguments("usage: new <name>".into()));
    }
    let book = context.manager.new_book(&name);
    tracing::info!(book_id = %book.id, "book created");
    output::success(format!("New book `{}` created.", book.name));
    output::hint("Use `save <name>` to persist it.");
    Ok(())
}

fn cmd_load(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        let books = context.manager.storage().list_books()?;
        if books.is_empty() {
            output::info("No saved books.");
        }
        for book in books {
            output::info(format!("  {book}"));
        }
        return Ok(());
    };

    let engine = context.engine();
    let book = context.manager.load(name)?;
    let (expenses, book_name) = (book.expenses.len(), book.name.clone());
    if let Ok(book) = context.manager.current_mut() {
        let changed = ExpenseService::recompute_all(book, &engine);
        if changed > 0 {
            output::warning(format!(
                "{changed} expense(s) recomputed with the configured rate."
            ));
        }
    }
    context.remember_book(name)?;
    output::success(format!("Loaded `{}` ({} expenses).", book_name, expenses));
    Ok(())
}

fn cmd_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = match args.first() {
        Some(name) => {
            let path = context.manager.save_as(name)?;
            context.remember_book(name)?;
            path
        }
        None => context.manager.save().map_err(|err| match err {
            crate::core::CrmError::Storage(_) => {
                CommandError::InvalidArguments("book is unnamed; use `save <name>`".into())
            }
            other => other.into(),
        })?,
    };
    output::success(format!("Saved to {}", path.display()));
    Ok(())
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let path = context.manager.backup(note.as_deref())?;
    output::success(format!("Backup written to {}", path.display()));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.book()?;
    let name = current_name(context)?;
    let backups = context.manager.list_backups(&name)?;
    if backups.is_empty() {
        output::info("No backups yet.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = backups
        .iter()
        .map(|backup| {
            vec![
                backup.file_name.clone(),
                backup
                    .created_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "?".into()),
                backup.note.clone().unwrap_or_default(),
            ]
        })
        .collect();
    output::table(&["File", "Created (UTC)", "Note"], &rows);
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let backup = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: restore <backup-file>".into()))?;
    let name = current_name(context)?;
    let book = context.manager.restore(&name, backup)?;
    output::success(format!(
        "Restored `{}` ({} expenses) from {}.",
        book.name,
        book.expenses.len(),
        backup
    ));
    Ok(())
}

fn current_name(context: &ShellContext) -> Result<String, CommandError> {
    context
        .manager
        .current_name()
        .map(str::to_string)
        .ok_or_else(|| CommandError::InvalidArguments("book is unnamed; use `save <name>`".into()))
}
