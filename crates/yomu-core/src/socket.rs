//! Server mode transport: one TCP connection per document.
//!
//! The engine's server reads a document until the client half-closes its
//! write side, then writes the result and closes the connection. There is
//! no length prefix; the half-close is the only end-of-input signal.

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::timeout::run_with_timeout;
use crate::{BridgeError, OutputKind};

/// Size of each write and read on the connection.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Talks to a running engine server on `localhost:<port>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketCall {
    port: u16,
    kind: OutputKind,
}

impl SocketCall {
    /// `kind` is the output kind the server on `port` was started with.
    pub fn new(port: u16, kind: OutputKind) -> Self {
        Self { port, kind }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Submit `bytes` over a fresh connection and collect the response.
    ///
    /// A server only ever produces the kind it was started with, so a
    /// request for a different representation is rejected up front.
    pub async fn call(
        &self,
        kind: OutputKind,
        bytes: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, BridgeError> {
        if !self.kind.same_output(kind) {
            return Err(BridgeError::KindMismatch {
                port: self.port,
                server: self.kind,
                requested: kind,
            });
        }

        let started = Instant::now();
        let mut stream = TcpStream::connect(("localhost", self.port))
            .await
            .map_err(|source| BridgeError::Connect {
                port: self.port,
                source,
            })?;

        let outcome = run_with_timeout(timeout, async {
            exchange(&mut stream, bytes).await.map_err(BridgeError::from)
        })
        .await;
        tracing::debug!(
            port = self.port,
            kind = %kind,
            input = bytes.len(),
            elapsed = ?started.elapsed(),
            ok = outcome.is_ok(),
            "socket call finished"
        );
        outcome
    }
}

/// Write `bytes` in [`CHUNK_SIZE`] pieces, half-close, then read until the
/// peer closes.
pub async fn exchange<S>(stream: &mut S, bytes: &[u8]) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for chunk in bytes.chunks(CHUNK_SIZE) {
        stream.write_all(chunk).await?;
    }
    // On a TcpStream this shuts down the write direction only.
    stream.shutdown().await?;

    let mut response = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&buf[..n]);
    }
    Ok(response)
}
