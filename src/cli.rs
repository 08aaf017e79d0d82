//! Command-line configuration for the portico commands.
//!
//! The types live in `cli-defs` so the build script can render the man page
//! from the same definitions the runtime parses. Each struct is loaded
//! through `ortho_config`, layering defaults, the `.portico.toml` dotfile,
//! `PORTICO_*` environment variables and command-line flags.

pub use cli_defs::{
    Cli,
    Commands,
    DEFAULT_ADMIN_ADDR,
    DEFAULT_PINGBACK_TIMEOUT_SECS,
    RunConfig,
    StartConfig,
    StopConfig,
};
