//! Build script for man page generation and build metadata.
//!
//! Generates a man page for the `portico` binary using `clap_mangen`. The CLI
//! definitions are imported from the `cli-defs` crate, which provides stable
//! types shared between build-time and runtime consumers.
//!
//! The script also records the package's module path and version in
//! `PORTICO_BUILD_MODULES` so the runtime can report what it was built from.

use std::{env, fs, io, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;
use cli_defs::Cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs");
    record_build_modules();

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            // Cargo does not set OUT_DIR for `cargo check` or IDE analysis runs.
            return Ok(());
        }
    };
    let bin_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "portico".into());

    let cmd = Cli::command();
    let man = Man::new(cmd);

    let man_path = out_dir.join(format!("{bin_name}.1"));
    let mut file = fs::File::create(&man_path)?;
    man.render(&mut file)?;

    Ok(())
}

/// Emit `name@version` entries for the runtime's build-metadata lookup.
///
/// Nothing is emitted when Cargo leaves either variable unset; the runtime
/// then reports an unknown version.
fn record_build_modules() {
    let (Ok(name), Ok(version)) = (env::var("CARGO_PKG_NAME"), env::var("CARGO_PKG_VERSION"))
    else {
        return;
    };
    if version.is_empty() {
        return;
    }
    println!("cargo::rustc-env=PORTICO_BUILD_MODULES={name}@{version}");
}
