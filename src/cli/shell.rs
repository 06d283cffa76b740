use std::{
    borrow::Cow,
    io::{self, BufRead},
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Context as ReadlineContext, Editor, Helper,
};

use crate::cli::context::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;

const SCRIPT_ENV: &str = "BOATBUILD_CLI_SCRIPT";

/// Runs the shell: interactive with line editing, or line-by-line from stdin when
/// `BOATBUILD_CLI_SCRIPT` is set.
pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    tracing::debug!(?mode, "shell started");

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<UsageHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(UsageHelper::new(context.command_usages())));
    output::info("BoatBuild hak ediş shell. Type `help` for commands.");

    while context.running {
        let prompt = context.prompt();
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                output::hint("Type `exit` to leave the shell.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        editor.add_history_entry(trimmed).ok();
        if run_line(context, trimmed) == LoopControl::Exit {
            break;
        }
    }
    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        // Blank lines and `#` comments let scripts be annotated.
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if run_line(context, trimmed) == LoopControl::Exit || !context.running {
            break;
        }
    }
    Ok(())
}

/// Runs one line, reporting any command failure in place.
fn run_line(context: &mut ShellContext, line: &str) -> LoopControl {
    match handle_line(context, line) {
        Ok(control) => control,
        Err(err) => {
            context.report_error(err);
            LoopControl::Continue
        }
    }
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = shell_words::split(line)
        .map_err(|err| CommandError::InvalidArguments(format!("could not parse input: {err}")))?;
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };

    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    tracing::debug!(command = %command, args = args.len(), "dispatching");

    let control = context.dispatch(&command, raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Completes command names and hints the usage line once a command is typed.
struct UsageHelper {
    commands: Vec<(&'static str, &'static str)>,
}

impl UsageHelper {
    fn new(mut commands: Vec<(&'static str, &'static str)>) -> Self {
        commands.sort_by_key(|(name, _)| *name);
        Self { commands }
    }

    fn usage(&self, name: &str) -> Option<&'static str> {
        self.commands
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, usage)| *usage)
    }
}

impl Helper for UsageHelper {}

impl Completer for UsageHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix.len() - prefix.trim_start().len();
        // Arguments are free text; only the command word completes.
        if prefix[start..].contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let needle = prefix[start..].to_ascii_lowercase();
        let candidates = self
            .commands
            .iter()
            .filter(|(name, _)| name.starts_with(&needle))
            .map(|(name, _)| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for UsageHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos != line.len() {
            return None;
        }
        let name = line.trim_start().strip_suffix(' ')?;
        if name.contains(char::is_whitespace) {
            return None;
        }
        let usage = self.usage(name)?;
        let args = usage.split_once(' ')?.1;
        Some(args.to_string())
    }
}

impl Highlighter for UsageHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for UsageHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> UsageHelper {
        UsageHelper::new(vec![
            ("preview", "preview <amount> <scope> <policy> [--approved]"),
            ("exit", "exit"),
        ])
    }

    #[test]
    fn usage_lookup_ignores_case() {
        let helper = helper();
        assert_eq!(helper.usage("PREVIEW"), Some("preview <amount> <scope> <policy> [--approved]"));
        assert_eq!(helper.usage("exit"), Some("exit"));
        assert_eq!(helper.usage("missing"), None);
    }
}
