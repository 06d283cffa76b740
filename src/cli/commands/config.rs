use crate::cli::commands::CommandDefinition;
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::core::services::ExpenseService;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "config",
        "View and manage global preferences",
        "config [show|set <key> <value>|backup [note]|backups|restore <name>]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return show(context);
    };

    match action.to_lowercase().as_str() {
        "show" => show(context),
        "set" => {
            if rest.len() < 2 {
                return Err(CommandError::InvalidArguments(
                    "usage: config set <locale|currency|hak_edis_rate|advertising_tag|special_vendors|backup_retention> <value>"
                        .into(),
                ));
            }
            let previous_rate = context.config.hak_edis_rate;
            context.config.set(rest[0], &rest[1..].join(" "))?;
            context.persist_config()?;
            output::success(format!("Updated `{}`.", rest[0]));
            if context.config.hak_edis_rate != previous_rate {
                rate_changed(context);
            }
            Ok(())
        }
        "backup" => {
            let note = (!rest.is_empty()).then(|| rest.join(" "));
            let name = context
                .config_manager
                .backup(&context.config, note.as_deref())?;
            output::success(format!("Configuration backup `{}` created.", name));
            Ok(())
        }
        "backups" => {
            let backups = context.config_manager.list_backups()?;
            if backups.is_empty() {
                output::info("No configuration backups.");
            }
            for name in backups {
                output::info(format!("  {name}"));
            }
            Ok(())
        }
        "restore" => {
            let name = rest.first().ok_or_else(|| {
                CommandError::InvalidArguments("usage: config restore <name>".into())
            })?;
            let previous_rate = context.config.hak_edis_rate;
            context.config = context.config_manager.restore(name)?;
            output::success(format!("Configuration restored from `{}`.", name));
            if context.config.hak_edis_rate != previous_rate {
                rate_changed(context);
            }
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config action `{other}`"
        ))),
    }
}

fn show(context: &ShellContext) -> CommandResult {
    let config = &context.config;
    output::section("Configuration");
    output::info(format!("  locale           : {}", config.locale));
    output::info(format!("  currency         : {}", config.currency));
    output::info(format!("  hak_edis_rate    : {}", config.hak_edis_rate));
    output::info(format!("  advertising_tag  : {}", config.advertising_tag));
    output::info(format!(
        "  special_vendors  : {}",
        config.special_vendors.join(", ")
    ));
    output::info(format!("  backup_retention : {}", config.backup_retention));
    output::info(format!(
        "  file             : {}",
        context.config_manager.path().display()
    ));
    Ok(())
}

fn rate_changed(context: &mut ShellContext) {
    let engine = context.engine();
    if let Ok(book) = context.book_mut() {
        let changed = ExpenseService::recompute_all(book, &engine);
        output::info(format!("{changed} expense(s) recomputed at the new rate."));
    }
}
