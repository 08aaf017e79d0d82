//! Read-only reporting commands.
//!
//! The writers take any [`Write`] so tests can capture their output; the
//! command bodies point them at standard output.

use std::{
    ffi::OsString,
    io::{self, Write},
};

use anyhow::Context;

use super::Invocation;
use crate::{
    build_info::{BuildModule, build_module},
    dispatch::CommandError,
    server::{MODULES, ModuleInfo},
};

/// `version`: print the build version.
///
/// # Errors
///
/// Fails with exit code 1 if standard output cannot be written.
pub fn version(_invocation: &Invocation) -> Result<(), CommandError> {
    write_version(&mut io::stdout().lock(), &build_module())
        .context("failed to write version")
        .map_err(CommandError::failed_startup)
}

/// `list-modules`: print the identifier of every compiled-in component.
///
/// # Errors
///
/// Fails with exit code 1 if standard output cannot be written.
pub fn list_modules(_invocation: &Invocation) -> Result<(), CommandError> {
    write_modules(&mut io::stdout().lock(), MODULES)
        .context("failed to write module list")
        .map_err(CommandError::failed_startup)
}

/// `environ`: print the process environment.
///
/// # Errors
///
/// Fails with exit code 1 if standard output cannot be written.
pub fn environ(_invocation: &Invocation) -> Result<(), CommandError> {
    write_environ(&mut io::stdout().lock(), std::env::vars_os())
        .context("failed to write environment")
        .map_err(CommandError::failed_startup)
}

/// Write the version line for `module`.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_version<W: Write>(out: &mut W, module: &BuildModule) -> io::Result<()> {
    writeln!(out, "{}", module.version)
}

/// Write one module identifier per line.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_modules<W: Write>(out: &mut W, modules: &[ModuleInfo]) -> io::Result<()> {
    for module in modules {
        writeln!(out, "{}", module.id)?;
    }
    Ok(())
}

/// Write `KEY=VALUE` lines sorted by key. Non-UTF-8 data is rendered
/// lossily.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_environ<W, I>(out: &mut W, vars: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut pairs: Vec<_> = vars.into_iter().collect();
    pairs.sort_by(|(left, _), (right, _)| left.cmp(right));
    for (key, value) in pairs {
        writeln!(
            out,
            "{}={}",
            key.to_string_lossy(),
            value.to_string_lossy()
        )?;
    }
    Ok(())
}
