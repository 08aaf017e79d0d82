//! Shared CLI type definitions for portico build and runtime.
//!
//! This crate provides the per-command configuration types used by both the
//! `build.rs` script (for man page generation) and the runtime binary.
//! Keeping them here lets the build script render the command surface without
//! compiling the server itself.

// FIXME: File-wide suppressions are unavoidable here. Clap and OrthoConfig derive macros
// inject generated code throughout the module, and there is no mechanism to narrow
// the scope without restructuring the crate.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![expect(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Default admin endpoint. Loopback only: the admin protocol is unauthenticated.
pub const DEFAULT_ADMIN_ADDR: &str = "127.0.0.1:2019";
/// Seconds `start` waits for the background process to confirm.
pub const DEFAULT_PINGBACK_TIMEOUT_SECS: u64 = 30;

/// Configuration for the `run` subcommand.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "PORTICO_")]
pub struct RunConfig {
    /// Address the admin endpoint listens on.
    #[ortho_config(default = DEFAULT_ADMIN_ADDR.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_ADMIN_ADDR))]
    pub admin: String,
    /// Echo the token read from stdin to this address once the server is up.
    #[arg(long)]
    pub pingback: Option<String>,
}

/// Configuration for the `start` subcommand.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "PORTICO_")]
pub struct StartConfig {
    /// Address the background server's admin endpoint listens on.
    #[ortho_config(default = DEFAULT_ADMIN_ADDR.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_ADMIN_ADDR))]
    pub admin: String,
    /// Seconds to wait for the background server to confirm startup.
    #[ortho_config(default = DEFAULT_PINGBACK_TIMEOUT_SECS)]
    #[arg(long, default_value_t = DEFAULT_PINGBACK_TIMEOUT_SECS)]
    pub pingback_timeout_secs: u64,
}

/// Configuration for the `stop` subcommand.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "PORTICO_")]
pub struct StopConfig {
    /// Admin endpoint of the server to stop.
    #[ortho_config(default = DEFAULT_ADMIN_ADDR.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_ADMIN_ADDR))]
    pub admin: String,
}

/// Subcommands exposed by `portico`.
///
/// The runtime resolves commands through its registry; this enum only
/// describes the surface for generated documentation.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the server in the background and wait for it to confirm.
    Start(StartConfig),
    /// Ask a running server to shut down gracefully.
    Stop(StopConfig),
    /// Run the server in the foreground.
    Run(RunConfig),
    /// Print the build version.
    Version,
    /// List the components compiled into the runtime.
    #[command(name = "list-modules")]
    ListModules,
    /// Print the process environment.
    Environ,
}

/// Top-level CLI description consumed by the man page generator.
#[derive(Parser, Debug, Clone)]
#[command(name = "portico", about = "Local server with pingback-verified background start")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}
