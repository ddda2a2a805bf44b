//! The delegation seam between the extraction facade and the engine.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::process::ProcessCall;
use crate::server::ServerSlot;
use crate::socket::SocketCall;
use crate::{BridgeError, OutputKind};

pub type BridgeFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, BridgeError>> + Send + 'a>>;

/// Gets document bytes to the engine and its raw response back.
pub trait Bridge: Send + Sync {
    /// Short name used in logs (e.g. "process", "socket").
    fn name(&self) -> &str;

    fn invoke<'a>(
        &'a self,
        kind: OutputKind,
        bytes: &'a [u8],
        timeout: Option<Duration>,
    ) -> BridgeFuture<'a>;
}

impl Bridge for ProcessCall {
    fn name(&self) -> &str {
        "process"
    }

    fn invoke<'a>(
        &'a self,
        kind: OutputKind,
        bytes: &'a [u8],
        timeout: Option<Duration>,
    ) -> BridgeFuture<'a> {
        Box::pin(self.call(kind, bytes, timeout))
    }
}

impl Bridge for SocketCall {
    fn name(&self) -> &str {
        "socket"
    }

    fn invoke<'a>(
        &'a self,
        kind: OutputKind,
        bytes: &'a [u8],
        timeout: Option<Duration>,
    ) -> BridgeFuture<'a> {
        Box::pin(self.call(kind, bytes, timeout))
    }
}

/// Uses the server held in a [`ServerSlot`] while one is running and falls
/// back to a subprocess per call otherwise.
#[derive(Debug, Clone)]
pub struct AutoBridge {
    process: ProcessCall,
    servers: Arc<ServerSlot>,
}

impl AutoBridge {
    pub fn new(process: ProcessCall, servers: Arc<ServerSlot>) -> Self {
        Self { process, servers }
    }

    pub fn servers(&self) -> &Arc<ServerSlot> {
        &self.servers
    }
}

impl Bridge for AutoBridge {
    fn name(&self) -> &str {
        "auto"
    }

    fn invoke<'a>(
        &'a self,
        kind: OutputKind,
        bytes: &'a [u8],
        timeout: Option<Duration>,
    ) -> BridgeFuture<'a> {
        Box::pin(async move {
            match self.servers.socket_call().await {
                Some(socket) => socket.call(kind, bytes, timeout).await,
                None => self.process.call(kind, bytes, timeout).await,
            }
        })
    }
}
