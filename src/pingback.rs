//! Pingback handshake used when handing the server off to a background
//! process.
//!
//! The parent binds a loopback listener, passes a random token to the child
//! on standard input and waits. Once the child is serving it connects back
//! and echoes the token. The parent accepts the handoff only if the first
//! bytes it reads are exactly the token.
//!
//! There is no framing: the confirmation is whatever the peer sends before
//! closing its write side, capped at [`PINGBACK_READ_LIMIT`] bytes.

use std::{
    fmt,
    io::{self, Read},
};

use rand::RngCore;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, net::TcpStream};

/// Maximum number of bytes read from a confirming peer.
pub const PINGBACK_READ_LIMIT: usize = 32;

/// Errors reported by the pingback handshake.
#[derive(Debug, Error)]
pub enum PingbackError {
    /// The connection failed before the confirmation was complete.
    #[error("failed to read pingback confirmation: {0}")]
    Io(#[from] io::Error),
    /// The peer sent something other than the expected token.
    #[error("wrong confirmation: {}", hex::encode(.received))]
    Mismatch {
        /// Bytes actually read from the peer.
        received: Vec<u8>,
    },
    /// No token arrived on the child's input.
    #[error("no pingback token received")]
    EmptyToken,
}

impl PingbackError {
    /// Whether the peer answered with the wrong bytes, as opposed to the
    /// connection failing.
    #[must_use]
    pub const fn is_mismatch(&self) -> bool { matches!(self, Self::Mismatch { .. }) }
}

/// Random secret a background process must echo to confirm startup.
#[derive(Clone, PartialEq, Eq)]
pub struct PingbackToken([u8; PINGBACK_READ_LIMIT]);

impl PingbackToken {
    /// Draw a fresh token from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; PINGBACK_READ_LIMIT];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw token bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] { &self.0 }
}

impl fmt::Debug for PingbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PingbackToken(<redacted>)")
    }
}

/// Read a confirmation from `conn` and check it against `expected`.
///
/// Reads until the peer closes its write side or [`PINGBACK_READ_LIMIT`]
/// bytes have arrived, whichever comes first. The connection is consumed and
/// dropped before this returns, on success and failure alike. The call
/// blocks; set a read timeout on the socket to bound it.
///
/// # Errors
///
/// Returns [`PingbackError::Io`] if reading fails and
/// [`PingbackError::Mismatch`] unless the bytes read equal `expected`
/// exactly.
pub fn verify_pingback<R: Read>(conn: R, expected: &[u8]) -> Result<(), PingbackError> {
    let received = read_bounded(conn)?;
    if received == expected {
        Ok(())
    } else {
        Err(PingbackError::Mismatch { received })
    }
}

/// Read the token a parent wrote to this process's input.
///
/// # Errors
///
/// Returns [`PingbackError::Io`] if reading fails and
/// [`PingbackError::EmptyToken`] if the input closed without any bytes.
pub fn read_token<R: Read>(input: R) -> Result<Vec<u8>, PingbackError> {
    let token = read_bounded(input)?;
    if token.is_empty() {
        return Err(PingbackError::EmptyToken);
    }
    Ok(token)
}

/// Echo `token` to the parent listening on `addr`, then close the connection.
///
/// # Errors
///
/// Returns any I/O error raised while connecting or writing.
pub async fn send_pingback(addr: &str, token: &[u8]) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(token).await?;
    stream.shutdown().await
}

fn read_bounded<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(PINGBACK_READ_LIMIT);
    reader
        .take(PINGBACK_READ_LIMIT as u64)
        .read_to_end(&mut buf)?;
    Ok(buf)
}
