//! Binary entry point for portico.
//!
//! This is the only place the process exit status is decided: the library
//! reports an [`Outcome`](portico::dispatch::Outcome) and `main` converts it.

#![expect(
    clippy::print_stderr,
    reason = "logging setup failures cannot be reported through tracing"
)]

use std::{env, io, path::Path, process::ExitCode};

use portico::{
    commands::{Invocation, standard_registry},
    dispatch::{EXIT_CODE_FAILED_STARTUP, dispatch},
    logging,
};
use tracing::error;

const DEFAULT_PROGRAM: &str = "portico";

fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("failed to initialise logging: {err}");
    }

    let mut args = env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let program = args
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map_or_else(
            || DEFAULT_PROGRAM.to_owned(),
            |name| name.to_string_lossy().into_owned(),
        );
    let command = args.next();
    let invocation = Invocation::new(program.clone(), args.collect());

    let registry = match standard_registry(invocation) {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = %err, "failed to build command registry");
            return ExitCode::from(EXIT_CODE_FAILED_STARTUP);
        }
    };

    match dispatch(&registry, &program, command.as_deref(), &mut io::stdout()) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            error!(error = %err, "failed to write to standard output");
            ExitCode::from(EXIT_CODE_FAILED_STARTUP)
        }
    }
}
