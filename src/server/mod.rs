//! Admin endpoint for a running portico server.
//!
//! The endpoint is a loopback TCP listener speaking newline-terminated ASCII.
//! It greets every client with [`ADMIN_GREETING`] and understands a single
//! request, `STOP`, which triggers a graceful shutdown. Client tasks are
//! tracked in a [`JoinSet`] and told to finish through a watch channel once
//! the server stops.

mod request;

use std::{future::Future, io, net::SocketAddr, time::Duration};

use anyhow::{Context, Result, bail};
pub use request::{AdminRequest, AdminRequestError};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{mpsc, watch},
    task::JoinSet,
    time::timeout,
};
use tracing::{debug, info, warn};

/// Line sent to every admin client on connect.
pub const ADMIN_GREETING: &str = "PORTICO";
/// Reply to an accepted request.
pub const ADMIN_OK: &str = "OK";
/// Upper bound for a complete `stop` exchange.
pub const ADMIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A component compiled into the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Dotted identifier.
    pub id: &'static str,
    /// One-line description.
    pub summary: &'static str,
}

/// Components compiled into this runtime, in load order.
pub const MODULES: &[ModuleInfo] = &[
    ModuleInfo {
        id: "admin.endpoint",
        summary: "loopback line protocol for administrative requests",
    },
    ModuleInfo {
        id: "admin.stop",
        summary: "graceful shutdown on STOP",
    },
    ModuleInfo {
        id: "lifecycle.pingback",
        summary: "token confirmation for background starts",
    },
    ModuleInfo {
        id: "lifecycle.signals",
        summary: "graceful shutdown on SIGTERM or Ctrl-C",
    },
];

/// Bound admin listener, ready to serve.
#[derive(Debug)]
pub struct AdminServer {
    listener: TcpListener,
}

impl AdminServer {
    /// Bind the admin endpoint.
    ///
    /// # Errors
    ///
    /// Returns any error raised while binding `addr`.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Address the endpoint actually listens on.
    ///
    /// # Errors
    ///
    /// Propagates failures from the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Serve admin clients until `shutdown` resolves or a client sends
    /// `STOP`, then wait for in-flight clients to finish.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept failures are logged and the
    /// loop continues.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let mut join_set = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                Some(()) = stop_rx.recv() => {
                    info!("stop requested through admin endpoint");
                    break;
                }
                res = self.listener.accept() => {
                    handle_accept_result(res, &stop_tx, &shutdown_rx, &mut join_set);
                }
            }
        }

        drop(self.listener);
        shutdown_tx.send_replace(true);
        await_spawned_tasks(&mut join_set).await;
        Ok(())
    }
}

fn handle_accept_result(
    res: io::Result<(TcpStream, SocketAddr)>,
    stop_tx: &mpsc::Sender<()>,
    shutdown_rx: &watch::Receiver<bool>,
    join_set: &mut JoinSet<()>,
) {
    match res {
        Ok((socket, peer)) => {
            let client_stop = stop_tx.clone();
            let mut client_shutdown = shutdown_rx.clone();
            join_set.spawn(async move {
                if let Err(err) = handle_client(socket, &client_stop, &mut client_shutdown).await {
                    warn!(%peer, error = %err, "admin connection error");
                }
            });
        }
        Err(err) => warn!(error = %err, "admin accept error"),
    }
}

async fn await_spawned_tasks(join_set: &mut JoinSet<()>) {
    while let Some(res) = join_set.join_next().await {
        if let Err(err) = res {
            warn!(error = %err, "admin task error");
        }
    }
}

/// Greet the client, then answer requests until it disconnects, asks to
/// stop, or the server shuts down.
async fn handle_client(
    socket: TcpStream,
    stop_tx: &mpsc::Sender<()>,
    shutdown: &mut watch::Receiver<bool>,
) -> io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    writer
        .write_all(format!("{ADMIN_GREETING}\n").as_bytes())
        .await?;
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            next = lines.next_line() => {
                let Some(line) = next? else {
                    break;
                };
                let request = line.trim();
                if request.is_empty() {
                    continue;
                }
                match request.parse::<AdminRequest>() {
                    Ok(AdminRequest::Stop) => {
                        writer.write_all(format!("{ADMIN_OK}\n").as_bytes()).await?;
                        if stop_tx.try_send(()).is_err() {
                            debug!("stop already pending");
                        }
                        break;
                    }
                    Err(err) => {
                        writer.write_all(format!("ERR {err}\n").as_bytes()).await?;
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    writer.shutdown().await
}

/// Ask the server behind `addr` to stop.
///
/// # Errors
///
/// Fails if the endpoint cannot be reached, does not identify as a portico
/// admin endpoint, refuses the request, or takes longer than
/// [`ADMIN_REQUEST_TIMEOUT`].
pub async fn request_stop(addr: &str) -> Result<()> {
    timeout(ADMIN_REQUEST_TIMEOUT, exchange_stop(addr))
        .await
        .with_context(|| format!("timed out talking to admin endpoint {addr}"))?
}

async fn exchange_stop(addr: &str) -> Result<()> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to admin endpoint {addr}"))?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    match lines.next_line().await? {
        Some(greeting) if greeting == ADMIN_GREETING => {}
        _ => bail!("{addr} is not a portico admin endpoint"),
    }
    writer.write_all(b"STOP\n").await?;
    match lines.next_line().await? {
        Some(reply) if reply == ADMIN_OK => Ok(()),
        Some(reply) => bail!("admin endpoint refused stop request: {reply}"),
        None => bail!("admin endpoint closed the connection without replying"),
    }
}

/// Waits for a shutdown signal, completing when termination is requested.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            warn!(error = %err, "failed to listen for Ctrl-C");
                        }
                    },
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
    }
}

#[cfg(test)]
mod tests;
