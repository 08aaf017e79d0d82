//! Command registry and dispatcher for the process entry point.
//!
//! The registry is built once at startup and never mutated. [`dispatch`]
//! resolves the first positional argument against it, runs the matching
//! operation and reports an [`Outcome`]. Turning that outcome into a process
//! exit status is left to `main`, the only place allowed to end the process.

use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use thiserror::Error;
use tracing::error;

/// Exit code for a successful run or when only usage was shown.
pub const EXIT_CODE_SUCCESS: u8 = 0;
/// Exit code for a command that failed to start or complete.
pub const EXIT_CODE_FAILED_STARTUP: u8 = 1;
/// Exit code for an unrecognized command name.
pub const EXIT_CODE_UNKNOWN_COMMAND: u8 = 2;

/// A registered command body.
pub type Operation = Box<dyn Fn() -> Result<(), CommandError> + Send + Sync>;

/// Failure reported by an operation, paired with the exit code it demands.
#[derive(Debug, Error)]
#[error("{error:#}")]
pub struct CommandError {
    exit_code: u8,
    error: anyhow::Error,
}

impl CommandError {
    /// Wrap `error` so the process exits with `exit_code`.
    pub fn new(exit_code: u8, error: impl Into<anyhow::Error>) -> Self {
        Self {
            exit_code,
            error: error.into(),
        }
    }

    /// Shorthand for a failure with [`EXIT_CODE_FAILED_STARTUP`].
    pub fn failed_startup(error: impl Into<anyhow::Error>) -> Self {
        Self::new(EXIT_CODE_FAILED_STARTUP, error)
    }

    /// Exit code the process should terminate with.
    #[must_use]
    pub const fn exit_code(&self) -> u8 { self.exit_code }
}

/// Errors raised while building a [`CommandRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two operations were registered under the same name.
    #[error("command {0:?} registered twice")]
    Duplicate(String),
    /// A command name was empty.
    #[error("command names must not be empty")]
    EmptyName,
}

struct RegisteredCommand {
    summary: &'static str,
    operation: Operation,
}

/// Immutable mapping from command name to operation.
pub struct CommandRegistry {
    commands: BTreeMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    /// Start building a registry.
    #[must_use]
    pub const fn builder() -> RegistryBuilder {
        RegistryBuilder {
            commands: BTreeMap::new(),
        }
    }

    /// Whether `name` is registered. Matching is exact and case-sensitive.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.commands.contains_key(name) }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> { self.commands.keys().map(String::as_str) }

    /// Usage text listing every registered command.
    #[must_use]
    pub fn usage(&self, program: &str) -> String {
        let width = self.commands.keys().map(String::len).max().unwrap_or(0);
        let mut text = format!("usage: {program} <command> [<args>]\n\ncommands:\n");
        for (name, command) in &self.commands {
            text.push_str(&format!("  {name:<width$}  {}\n", command.summary));
        }
        text.push_str(&format!("\nRun '{program} <command> --help' for command options."));
        text
    }

    fn get(&self, name: &str) -> Option<&RegisteredCommand> { self.commands.get(name) }
}

/// Collects operations before freezing them into a [`CommandRegistry`].
pub struct RegistryBuilder {
    commands: BTreeMap<String, RegisteredCommand>,
}

impl RegistryBuilder {
    /// Register `operation` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if `name` is already taken and
    /// [`RegistryError::EmptyName`] if it is empty.
    pub fn register<F>(
        mut self,
        name: &str,
        summary: &'static str,
        operation: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn() -> Result<(), CommandError> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.commands.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_owned()));
        }
        self.commands.insert(
            name.to_owned(),
            RegisteredCommand {
                summary,
                operation: Box::new(operation),
            },
        );
        Ok(self)
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            commands: self.commands,
        }
    }
}

/// What happened when a command line was dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No command was given; usage was printed.
    Usage,
    /// The command name is not registered.
    UnknownCommand(String),
    /// The operation completed.
    Succeeded,
    /// The operation failed and asked for this exit code.
    Failed {
        /// Exit code reported by the operation.
        exit_code: u8,
    },
}

impl Outcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage | Self::Succeeded => EXIT_CODE_SUCCESS,
            Self::UnknownCommand(_) => EXIT_CODE_UNKNOWN_COMMAND,
            Self::Failed { exit_code } => *exit_code,
        }
    }
}

/// Resolve `command` against `registry` and run it.
///
/// Usage and unknown-command diagnostics go to `out`; operation failures are
/// logged. At most one operation runs.
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn dispatch<W: Write>(
    registry: &CommandRegistry,
    program: &str,
    command: Option<&str>,
    out: &mut W,
) -> io::Result<Outcome> {
    let Some(name) = command else {
        writeln!(out, "{}", registry.usage(program))?;
        return Ok(Outcome::Usage);
    };

    let Some(registered) = registry.get(name) else {
        writeln!(out, "{name:?} is not a valid command")?;
        return Ok(Outcome::UnknownCommand(name.to_owned()));
    };

    match (registered.operation)() {
        Ok(()) => Ok(Outcome::Succeeded),
        Err(err) => {
            error!(command = name, exit_code = err.exit_code(), error = %err, "command failed");
            Ok(Outcome::Failed {
                exit_code: err.exit_code(),
            })
        }
    }
}
