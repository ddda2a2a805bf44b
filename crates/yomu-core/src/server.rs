//! Server mode lifecycle.
//!
//! A [`ServerHandle`] owns one long-lived engine process listening on
//! `localhost:<port>`. `start` returns once the port accepts connections;
//! `stop` interrupts the process and returns without waiting for it to exit.
//! [`ServerSlot`] holds at most one handle behind a mutex for callers that
//! want a single shared server.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::socket::SocketCall;
use crate::{BridgeError, EngineConfig, OutputKind};

#[derive(Debug)]
pub struct ServerHandle {
    child: Option<Child>,
    port: u16,
    kind: OutputKind,
}

impl ServerHandle {
    /// Launch the engine in server mode and wait until `port` accepts
    /// connections. Falls back to `engine.port` when `port` is `None`.
    pub async fn start(
        engine: &EngineConfig,
        kind: OutputKind,
        port: Option<u16>,
    ) -> Result<Self, BridgeError> {
        let port = port.unwrap_or(engine.port);
        // A listener already on the port would pass the readiness probe
        // while our engine fails to bind.
        if TcpStream::connect(("localhost", port)).await.is_ok() {
            return Err(BridgeError::PortInUse(port));
        }
        let command = engine.server_command(kind, port);
        let child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: command.program.display().to_string(),
                source,
            })?;
        tracing::info!(port, kind = %kind, pid = child.id(), command = %command, "starting engine server");

        let mut handle = Self {
            child: Some(child),
            port,
            kind,
        };
        // On error the handle is dropped here, which interrupts the child.
        handle
            .wait_until_ready(engine.startup_timeout, engine.probe_interval)
            .await?;
        tracing::info!(port, "engine server ready");
        Ok(handle)
    }

    /// Poll `localhost:<port>` until it accepts a connection.
    ///
    /// Each probe is a connection closed without sending anything, which the
    /// engine handles as an empty document submission.
    async fn wait_until_ready(
        &mut self,
        limit: Duration,
        interval: Duration,
    ) -> Result<(), BridgeError> {
        let started = Instant::now();
        loop {
            self.check_alive()?;
            if TcpStream::connect(("localhost", self.port)).await.is_ok() {
                // The engine must still be up one interval later.
                self.check_alive()?;
                tokio::time::sleep(interval).await;
                return self.check_alive();
            }
            let waited = started.elapsed();
            if waited >= limit {
                return Err(BridgeError::StartupTimeout {
                    port: self.port,
                    waited,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    fn check_alive(&mut self) -> Result<(), BridgeError> {
        if let Some(child) = self.child.as_mut()
            && let Some(status) = child.try_wait()?
        {
            self.child = None;
            return Err(BridgeError::EngineExited {
                status,
                stderr: String::new(),
            });
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn output_kind(&self) -> OutputKind {
        self.kind
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// True until [`stop`](Self::stop) has been called.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Transport for documents submitted to this server.
    pub fn socket_call(&self) -> SocketCall {
        SocketCall::new(self.port, self.kind)
    }

    /// Interrupt the server. No-op when already stopped.
    ///
    /// Returns immediately; the port is released once the engine finishes
    /// its own shutdown.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        tracing::info!(port = self.port, pid = child.id(), "stopping engine server");
        interrupt(&mut child);
    }

    /// Interrupt the server and wait up to `grace` for it to exit, killing it
    /// if it does not.
    pub async fn shutdown(mut self, grace: Duration) -> Result<Option<ExitStatus>, BridgeError> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        tracing::info!(port = self.port, pid = child.id(), "shutting down engine server");
        interrupt(&mut child);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => Ok(Some(status?)),
            Err(_) => {
                tracing::warn!(port = self.port, ?grace, "engine server ignored interrupt, killing");
                child.kill().await?;
                Ok(child.try_wait()?)
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send SIGINT where supported, otherwise kill outright.
fn interrupt(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child and has not been reaped, so it
        // cannot have been recycled for an unrelated process.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
        if rc == 0 {
            return;
        }
        tracing::warn!(pid, error = %std::io::Error::last_os_error(), "failed to interrupt engine");
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "engine already exited");
    }
}

/// Holds at most one [`ServerHandle`], serialising start and stop.
#[derive(Debug, Default)]
pub struct ServerSlot {
    inner: Mutex<Option<ServerHandle>>,
}

impl ServerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a server, first shutting down any server already held.
    /// Returns the port the new server listens on.
    pub async fn start(
        &self,
        engine: &EngineConfig,
        kind: OutputKind,
        port: Option<u16>,
    ) -> Result<u16, BridgeError> {
        let mut slot = self.inner.lock().await;
        if let Some(previous) = slot.take() {
            tracing::warn!(port = previous.port(), "replacing running engine server");
            previous.shutdown(Duration::from_secs(5)).await?;
        }
        let handle = ServerHandle::start(engine, kind, port).await?;
        let port = handle.port();
        *slot = Some(handle);
        Ok(port)
    }

    /// Interrupt the held server, if any, without waiting for it to exit.
    pub async fn stop(&self) {
        if let Some(mut handle) = self.inner.lock().await.take() {
            handle.stop();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    pub async fn port(&self) -> Option<u16> {
        self.inner.lock().await.as_ref().map(|h| h.port())
    }

    /// Transport for the held server, if one is running.
    pub async fn socket_call(&self) -> Option<SocketCall> {
        self.inner.lock().await.as_ref().map(|h| h.socket_call())
    }

    /// Hand the held server to the caller.
    pub async fn take(&self) -> Option<ServerHandle> {
        self.inner.lock().await.take()
    }
}
