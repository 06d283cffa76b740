//! Shell state, dispatch and error reporting.

use std::io;

use chrono::NaiveDate;
use rustyline::error::ReadlineError;
use uuid::Uuid;

use crate::config::{Config, ConfigManager};
use crate::core::errors::CrmError;
use crate::core::services::Role;
use crate::core::BookManager;
use crate::domain::{ExpenseBook, Identifiable};
use crate::engine::{CommissionEngine, DocumentationPolicy};
use crate::storage::JsonStorage;

use super::commands::{self, CommandDefinition, CommandRegistry};
use super::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No expense book loaded. Use `new` or `load` first.")]
    BookNotLoaded,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Core(CrmError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CrmError> for CommandError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::BookNotLoaded => CommandError::BookNotLoaded,
            other => CommandError::Core(other),
        }
    }
}

/// Fatal shell errors; anything a single command raises is reported and the loop goes on.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CrmError),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) registry: CommandRegistry,
    pub(crate) manager: BookManager,
    pub(crate) config_manager: ConfigManager,
    pub(crate) config: Config,
    pub(crate) role: Role,
    pub(crate) running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let storage = JsonStorage::new(None, Some(config.backup_retention))?;
        output::set_preferences(output::OutputPreferences {
            plain: mode == CliMode::Script,
        });

        let mut context = Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            manager: BookManager::new(Box::new(storage)),
            config_manager,
            config,
            role: Role::Owner,
            running: true,
        };
        context.auto_load_last();
        Ok(context)
    }

    fn auto_load_last(&mut self) {
        if self.mode != CliMode::Interactive {
            return;
        }
        let Some(name) = self.config.last_opened_book.clone() else {
            return;
        };
        match self.manager.load(&name) {
            Ok(_) => output::success(format!("Loaded last book `{}`.", name)),
            Err(err) => tracing::warn!(book = %name, %err, "could not reopen last book"),
        }
    }

    pub(crate) fn prompt(&self) -> String {
        match self.manager.current_name() {
            Some(name) => format!("boatbuild({name})> "),
            None => match &self.manager.current {
                Some(book) => format!("boatbuild({}*)> ", book.name),
                None => "boatbuild> ".to_string(),
            },
        }
    }

    /// `(name, usage)` pairs for completion and inline hints.
    pub(crate) fn command_usages(&self) -> Vec<(&'static str, &'static str)> {
        self.registry
            .names()
            .filter_map(|name| self.registry.get(name).map(|def| (name, def.usage)))
            .collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub(crate) fn engine(&self) -> CommissionEngine {
        self.config.engine()
    }

    pub(crate) fn documentation_policy(&self) -> DocumentationPolicy {
        self.config.documentation_policy()
    }

    pub(crate) fn currency(&self) -> &str {
        &self.config.currency
    }

    pub(crate) fn book(&self) -> Result<&ExpenseBook, CommandError> {
        self.manager.current().map_err(CommandError::from)
    }

    pub(crate) fn book_mut(&mut self) -> Result<&mut ExpenseBook, CommandError> {
        self.manager.current_mut().map_err(CommandError::from)
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn remember_book(&mut self, name: &str) -> CommandResult {
        self.config.last_opened_book = Some(name.to_string());
        self.persist_config()
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.get(command).map(|def| def.handler) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        if let Some(name) = self.registry.closest(input) {
            output::hint(format!("Did you mean `{}`?", name));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::BookNotLoaded => {
                output::error(CommandError::BookNotLoaded);
                output::hint("Try `new \"Hull 42\"` to get started.");
            }
            CommandError::Core(CrmError::Validation(errors)) => {
                output::error("Validation failed:");
                for message in errors {
                    output::error(format!("  - {message}"));
                }
            }
            other => output::error(other),
        }
    }
}

/// Resolves a full id or unique prefix against `records`.
pub(crate) fn resolve_id<'a, T: Identifiable + 'a>(
    kind: &str,
    records: impl IntoIterator<Item = &'a T>,
    needle: &str,
) -> Result<Uuid, CommandError> {
    let ids: Vec<Uuid> = records.into_iter().map(Identifiable::id).collect();
    ExpenseBook::resolve_id(&ids, needle).ok_or_else(|| {
        CommandError::InvalidArguments(format!("no unique {kind} matches `{needle}`"))
    })
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    input
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid amount `{}`", input)))
}

pub(crate) fn short_id(id: Uuid) -> String {
    let mut short = id.to_string();
    short.truncate(8);
    short
}

/// Splits `--flag value` pairs from positional arguments.
pub(crate) struct Args<'a> {
    pub positional: Vec<&'a str>,
    flags: Vec<(&'a str, Option<&'a str>)>,
}

impl<'a> Args<'a> {
    pub fn parse(raw: &[&'a str], valued: &[&str]) -> Result<Self, CommandError> {
        let mut positional = Vec::new();
        let mut flags = Vec::new();
        let mut iter = raw.iter().copied();
        while let Some(token) = iter.next() {
            if let Some(name) = token.strip_prefix("--") {
                if valued.contains(&name) {
                    let value = iter.next().ok_or_else(|| {
                        CommandError::InvalidArguments(format!("--{name} needs a value"))
                    })?;
                    flags.push((name, Some(value)));
                } else {
                    flags.push((name, None));
                }
            } else {
                positional.push(token);
            }
        }
        Ok(Self { positional, flags })
    }

    pub fn value(&self, name: &str) -> Option<&'a str> {
        self.flags
            .iter()
            .find(|(flag, _)| *flag == name)
            .and_then(|(_, value)| *value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.flags.iter().any(|(flag, _)| *flag == name)
    }

    pub fn required(&self, idx: usize, usage: &str) -> Result<&'a str, CommandError> {
        self.positional
            .get(idx)
            .copied()
            .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_split_flags_and_positionals() {
        let raw = ["1200", "CAM", "--date", "2025-05-01", "--docs", "Camcı"];
        let args = Args::parse(&raw, &["date"]).unwrap();
        assert_eq!(args.positional, vec!["1200", "CAM", "Camcı"]);
        assert_eq!(args.value("date"), Some("2025-05-01"));
        assert!(args.has("docs"));
        assert!(Args::parse(&["--date"], &["date"]).is_err());
    }

    #[test]
    fn amount_accepts_decimal_comma() {
        assert_eq!(parse_amount("1250,50").unwrap(), 1250.5);
        assert!(parse_amount("abc").is_err());
    }
}
