//! Command table for the shell. Each submodule contributes its definitions; the registry
//! keeps them in declaration order so `help` lists them by group.

use std::collections::HashMap;
use std::fmt;

pub mod book;
pub mod config;
pub mod expense;
pub mod overrides;
pub mod report;
pub mod system;

use strsim::levenshtein;

use crate::cli::context::{CommandResult, ShellContext};

/// Typos further than this from every command get no suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

pub(crate) fn all_definitions() -> Vec<CommandDefinition> {
    [
        (CommandGroup::Book, book::definitions()),
        (CommandGroup::Expenses, expense::definitions()),
        (CommandGroup::Overrides, overrides::definitions()),
        (CommandGroup::Reports, report::definitions()),
        (CommandGroup::Settings, config::definitions()),
        (CommandGroup::Shell, system::definitions()),
    ]
    .into_iter()
    .flat_map(|(group, definitions)| {
        definitions
            .into_iter()
            .map(move |definition| definition.in_group(group))
    })
    .collect()
}

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandGroup {
    Book,
    Expenses,
    Overrides,
    Reports,
    Settings,
    #[default]
    Shell,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandGroup::Book => "Book",
            CommandGroup::Expenses => "Expenses & vendors",
            CommandGroup::Overrides => "Owner overrides",
            CommandGroup::Reports => "Reports",
            CommandGroup::Settings => "Settings",
            CommandGroup::Shell => "Shell",
        })
    }
}

#[derive(Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub group: CommandGroup,
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            group: CommandGroup::Shell,
            handler,
        }
    }

    fn in_group(mut self, group: CommandGroup) -> Self {
        self.group = group;
        self
    }
}

pub struct CommandRegistry {
    definitions: Vec<CommandDefinition>,
    index: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    /// Later definitions with a duplicate name are ignored.
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut index = HashMap::new();
        let mut kept = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if index.contains_key(definition.name) {
                tracing::warn!(command = definition.name, "duplicate command ignored");
                continue;
            }
            index.insert(definition.name, kept.len());
            kept.push(definition);
        }
        Self {
            definitions: kept,
            index,
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.index.get(name).map(|&idx| &self.definitions[idx])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|definition| definition.name)
    }

    /// Definitions of one group, in declaration order.
    pub fn in_group(&self, group: CommandGroup) -> impl Iterator<Item = &CommandDefinition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.group == group)
    }

    /// Groups that have at least one command, in first-seen order.
    pub fn groups(&self) -> Vec<CommandGroup> {
        let mut groups = Vec::new();
        for definition in &self.definitions {
            if !groups.contains(&definition.group) {
                groups.push(definition.group);
            }
        }
        groups
    }

    /// Closest command name to a mistyped one.
    pub fn closest(&self, input: &str) -> Option<&'static str> {
        let needle = input.to_lowercase();
        self.names()
            .map(|name| (levenshtein(name, &needle), name))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name)
    }
}
