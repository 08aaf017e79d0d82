//! Lifecycle commands: `start`, `run` and `stop`.
//!
//! `start` hands the server off to a background `run` process. It binds a
//! loopback pingback listener, spawns `run --pingback <addr>`, writes a fresh
//! token to the child's standard input and returns only once a connection
//! on the listener has echoed that token. The child keeps running after
//! `start` exits.
//!
//! A failed accept or a pingback connection that fails to read is treated
//! as transient and the listener keeps accepting until the deadline. A connection that
//! answers with the wrong bytes aborts the handoff and the child is killed.

#![expect(
    clippy::print_stdout,
    reason = "intentional user output for CLI commands"
)]

use std::{
    env,
    io,
    net::SocketAddr,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use ortho_config::OrthoConfig;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    process::{Child, Command},
    runtime::{Builder, Runtime},
    task,
    time::{Instant, sleep, sleep_until},
};
use tracing::{info, warn};

use super::Invocation;
use crate::{
    cli::{RunConfig, StartConfig, StopConfig},
    dispatch::CommandError,
    pingback::{PingbackError, PingbackToken, read_token, send_pingback, verify_pingback},
    server::{AdminServer, request_stop, shutdown_signal},
};

/// Loopback address the pingback listener binds to.
const PINGBACK_BIND_ADDR: &str = "127.0.0.1:0";
/// Floor for the read timeout applied to pingback connections.
const MIN_PINGBACK_READ_TIMEOUT: Duration = Duration::from_millis(10);
/// Pause after a failed `accept` before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// `start`: launch the server in the background and wait for confirmation.
///
/// # Errors
///
/// Fails with exit code 1 if configuration cannot be loaded, the child
/// cannot be spawned, it exits early, it does not confirm before the
/// deadline, or a peer answers the pingback with the wrong token.
pub fn start(invocation: &Invocation) -> Result<(), CommandError> {
    let config = StartConfig::load_from_iter(invocation.argv())
        .context("failed to load start configuration")
        .map_err(CommandError::failed_startup)?;
    let runtime = runtime().map_err(CommandError::failed_startup)?;
    let pid = runtime
        .block_on(start_background(&config))
        .map_err(CommandError::failed_startup)?;
    println!("Successfully started portico (pid={pid}) - portico is running in the background");
    Ok(())
}

/// `run`: serve in the foreground until stopped.
///
/// With `--pingback`, the token is read from standard input and echoed to
/// the given address once the admin endpoint is listening.
///
/// # Errors
///
/// Fails with exit code 1 if configuration or the token cannot be read, the
/// admin endpoint cannot be bound, or the pingback cannot be delivered.
pub fn run(invocation: &Invocation) -> Result<(), CommandError> {
    let config = RunConfig::load_from_iter(invocation.argv())
        .context("failed to load run configuration")
        .map_err(CommandError::failed_startup)?;
    let token = match config.pingback {
        Some(_) => Some(
            read_token(io::stdin().lock())
                .context("failed to read pingback token from stdin")
                .map_err(CommandError::failed_startup)?,
        ),
        None => None,
    };
    let runtime = runtime().map_err(CommandError::failed_startup)?;
    runtime
        .block_on(serve_foreground(&config, token.as_deref()))
        .map_err(CommandError::failed_startup)
}

/// `stop`: ask the server behind the admin endpoint to shut down.
///
/// # Errors
///
/// Fails with exit code 1 if configuration cannot be loaded or the admin
/// endpoint does not accept the request.
pub fn stop(invocation: &Invocation) -> Result<(), CommandError> {
    let config = StopConfig::load_from_iter(invocation.argv())
        .context("failed to load stop configuration")
        .map_err(CommandError::failed_startup)?;
    let runtime = runtime().map_err(CommandError::failed_startup)?;
    runtime
        .block_on(request_stop(&config.admin))
        .map_err(CommandError::failed_startup)?;
    info!(admin = %config.admin, "stop request accepted");
    Ok(())
}

fn runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")
}

async fn serve_foreground(config: &RunConfig, token: Option<&[u8]>) -> Result<()> {
    let server = AdminServer::bind(&config.admin)
        .await
        .with_context(|| format!("failed to bind admin endpoint {}", config.admin))?;
    info!(addr = %server.local_addr()?, "admin endpoint listening");

    if let (Some(addr), Some(expected)) = (config.pingback.as_deref(), token) {
        send_pingback(addr, expected)
            .await
            .with_context(|| format!("failed to confirm startup to {addr}"))?;
        info!(addr, "confirmed startup to parent");
    }

    server.serve(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

/// How a background start attempt ended.
enum Handoff {
    Confirmed(Result<(), PingbackError>),
    Exited(io::Result<ExitStatus>),
    TimedOut,
}

async fn start_background(config: &StartConfig) -> Result<u32> {
    let deadline = handoff_deadline(Instant::now(), config.pingback_timeout_secs)?;
    let listener = TcpListener::bind(PINGBACK_BIND_ADDR)
        .await
        .context("failed to open pingback listener")?;
    let pingback_addr = listener.local_addr()?;
    let token = PingbackToken::generate();

    let mut child = spawn_child(&config.admin, pingback_addr)?;
    let pid = child
        .id()
        .ok_or_else(|| anyhow!("background process exited immediately"))?;
    deliver_token(&mut child, &token).await?;

    let handoff = tokio::select! {
        res = await_confirmation(&listener, &token, deadline) => Handoff::Confirmed(res),
        status = child.wait() => Handoff::Exited(status),
        () = sleep_until(deadline) => Handoff::TimedOut,
    };

    match handoff {
        Handoff::Confirmed(Ok(())) => {
            info!(pid, "background process confirmed startup");
            Ok(pid)
        }
        Handoff::Confirmed(Err(err)) => {
            abandon(&mut child, pid).await;
            Err(anyhow::Error::new(err).context("pingback rejected; aborting start"))
        }
        Handoff::Exited(status) => {
            let exit = status.context("failed to wait for background process")?;
            Err(anyhow!(
                "background process exited before confirming startup: {exit}"
            ))
        }
        Handoff::TimedOut => {
            abandon(&mut child, pid).await;
            Err(anyhow!(
                "background process did not confirm startup within {}s",
                config.pingback_timeout_secs
            ))
        }
    }
}

/// Point in time by which the child must have confirmed startup.
fn handoff_deadline(now: Instant, timeout_secs: u64) -> Result<Instant> {
    now.checked_add(Duration::from_secs(timeout_secs))
        .ok_or_else(|| anyhow!("pingback timeout of {timeout_secs}s is out of range"))
}

fn spawn_child(admin: &str, pingback_addr: SocketAddr) -> Result<Child> {
    let exe = env::current_exe().context("failed to locate the portico executable")?;
    Command::new(exe)
        .arg("run")
        .arg("--admin")
        .arg(admin)
        .arg("--pingback")
        .arg(pingback_addr.to_string())
        .stdin(Stdio::piped())
        .spawn()
        .context("failed to spawn background process")
}

/// Write the token to the child's stdin and close it so the child sees EOF.
async fn deliver_token(child: &mut Child, token: &PingbackToken) -> Result<()> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("background process stdin is not piped"))?;
    stdin
        .write_all(token.as_bytes())
        .await
        .context("failed to send pingback token")?;
    stdin.shutdown().await.context("failed to close child stdin")?;
    Ok(())
}

/// Accept pingback connections until one verifies or one answers with the
/// wrong token. Failed accepts and unreadable connections are skipped.
async fn await_confirmation(
    listener: &TcpListener,
    token: &PingbackToken,
    deadline: Instant,
) -> Result<(), PingbackError> {
    confirm_from(|| listener.accept(), token, deadline).await
}

async fn confirm_from<A, F>(
    mut accept: A,
    token: &PingbackToken,
    deadline: Instant,
) -> Result<(), PingbackError>
where
    A: FnMut() -> F,
    F: Future<Output = io::Result<(TcpStream, SocketAddr)>>,
{
    loop {
        let (stream, peer) = match accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "failed to accept pingback connection; still waiting");
                sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        match check_connection(stream, token, deadline).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_mismatch() => {
                warn!(%peer, error = %err, "pingback peer sent the wrong token");
                return Err(err);
            }
            Err(err) => warn!(%peer, error = %err, "pingback attempt failed; still waiting"),
        }
    }
}

async fn check_connection(
    stream: TcpStream,
    token: &PingbackToken,
    deadline: Instant,
) -> Result<(), PingbackError> {
    let conn = stream.into_std()?;
    conn.set_nonblocking(false)?;
    let remaining = deadline.saturating_duration_since(Instant::now());
    conn.set_read_timeout(Some(remaining.max(MIN_PINGBACK_READ_TIMEOUT)))?;

    let expected = token.clone();
    task::spawn_blocking(move || verify_pingback(conn, expected.as_bytes()))
        .await
        .map_err(io::Error::other)?
}

async fn abandon(child: &mut Child, pid: u32) {
    if let Err(err) = child.kill().await {
        warn!(pid, error = %err, "failed to kill background process");
    }
}
