//! Shared helpers for integration tests.

use std::{
    net::TcpListener,
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    time::Duration,
};

use tempfile::TempDir;
use wait_timeout::ChildExt;

/// Upper bound for any single portico process in these tests.
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(30);

/// A `portico` command isolated from the caller's configuration.
///
/// The process runs in `workdir` so no stray `.portico.toml` is picked up,
/// and inherited `PORTICO_*` variables are removed.
pub fn portico(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_portico"));
    cmd.current_dir(workdir)
        .env_remove("PORTICO_ADMIN")
        .env_remove("PORTICO_PINGBACK")
        .env_remove("PORTICO_PINGBACK_TIMEOUT_SECS")
        .env("PORTICO_LOG", "warn")
        .stdin(Stdio::null());
    cmd
}

/// Fresh working directory for one test.
pub fn workdir() -> TempDir { tempfile::tempdir().expect("create temp dir") }

/// Reserve a loopback address that is free at the time of the call.
pub fn free_local_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").to_string()
}

/// Wait for `child` to exit, killing it if it overruns [`PROCESS_TIMEOUT`].
pub fn wait_bounded(child: &mut Child) -> ExitStatus {
    match child.wait_timeout(PROCESS_TIMEOUT).expect("wait for portico") {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            panic!("portico did not exit within {PROCESS_TIMEOUT:?}");
        }
    }
}
