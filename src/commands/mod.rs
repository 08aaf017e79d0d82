//! The standard portico commands and the registry that exposes them.
//!
//! Each command body takes the [`Invocation`] it was started with and
//! reports a [`CommandError`] carrying its exit code on failure. Lifecycle
//! commands (`start`, `run`, `stop`) live in [`lifecycle`]; the read-only
//! reporting commands in [`info`].

pub mod info;
pub mod lifecycle;

use std::sync::Arc;

use crate::dispatch::{CommandError, CommandRegistry, RegistryError};

/// Program name and the arguments that followed the command name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Record the program name and the arguments after the command name.
    #[must_use]
    pub const fn new(program: String, args: Vec<String>) -> Self { Self { program, args } }

    /// Program name as shown to the user.
    #[must_use]
    pub fn program(&self) -> &str { &self.program }

    /// Arguments after the command name.
    #[must_use]
    pub fn args(&self) -> &[String] { &self.args }

    /// Program name followed by the command arguments, ready for a parser
    /// that expects a full `argv`.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

type CommandFn = fn(&Invocation) -> Result<(), CommandError>;

/// Bind `command` to a shared invocation, producing a zero-argument
/// operation.
fn bound(
    invocation: &Arc<Invocation>,
    command: CommandFn,
) -> impl Fn() -> Result<(), CommandError> + Send + Sync + 'static {
    let shared = Arc::clone(invocation);
    move || command(&shared)
}

/// Build the registry of standard commands for one process invocation.
///
/// # Errors
///
/// Returns [`RegistryError`] if two commands share a name.
pub fn standard_registry(invocation: Invocation) -> Result<CommandRegistry, RegistryError> {
    let shared = Arc::new(invocation);
    let registry = CommandRegistry::builder()
        .register(
            "start",
            "Start the server in the background",
            bound(&shared, lifecycle::start),
        )?
        .register(
            "stop",
            "Stop a running server",
            bound(&shared, lifecycle::stop),
        )?
        .register(
            "run",
            "Run the server in the foreground",
            bound(&shared, lifecycle::run),
        )?
        .register(
            "version",
            "Print the build version",
            bound(&shared, info::version),
        )?
        .register(
            "list-modules",
            "List the components compiled into the runtime",
            bound(&shared, info::list_modules),
        )?
        .register(
            "environ",
            "Print the process environment",
            bound(&shared, info::environ),
        )?
        .build();
    Ok(registry)
}
