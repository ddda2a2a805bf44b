//! Process mode: one engine subprocess per request.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::timeout::run_with_timeout;
use crate::{BridgeError, EngineConfig, OutputKind};

/// Longest stderr excerpt carried in [`BridgeError::EngineExited`].
const STDERR_EXCERPT: usize = 2048;

/// Spawns the engine for every call, pipes the document through
/// stdin/stdout and tears the subprocess down afterwards.
#[derive(Debug, Clone)]
pub struct ProcessCall {
    engine: EngineConfig,
}

impl ProcessCall {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Run the engine once over `bytes` and return everything it wrote to
    /// stdout.
    ///
    /// The child is killed if the deadline elapses or the returned future is
    /// dropped. Stdout and stderr are drained while stdin is being written so
    /// a chatty engine cannot stall on a full pipe.
    pub async fn call(
        &self,
        kind: OutputKind,
        bytes: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, BridgeError> {
        let command = self.engine.process_command(kind);
        let started = Instant::now();
        let mut child = command
            .to_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: command.program.display().to_string(),
                source,
            })?;
        tracing::debug!(command = %command, pid = child.id(), "spawned engine");

        let mut stdin = child.stdin.take().ok_or_else(|| pipe_missing("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| pipe_missing("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| pipe_missing("stderr"))?;

        let outcome = run_with_timeout(timeout, async {
            let write = async move {
                stdin.write_all(bytes).await?;
                // Dropping stdin closes the pipe: end of input for the engine.
                stdin.shutdown().await
            };
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (written, read_out, read_err) = tokio::join!(
                write,
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err)
            );
            let status = child.wait().await?;

            // A dead engine explains a broken pipe better than the pipe does.
            if !status.success() {
                tracing::warn!(command = %command, %status, "engine exited with failure");
                return Err(BridgeError::EngineExited {
                    status,
                    stderr: stderr_excerpt(&err),
                });
            }
            written?;
            read_out?;
            read_err?;
            if !err.is_empty() {
                tracing::debug!(stderr = %stderr_excerpt(&err), "engine wrote to stderr");
            }
            Ok(out)
        })
        .await;

        if let Err(BridgeError::Timeout(limit)) = &outcome {
            tracing::warn!(command = %command, ?limit, "engine timed out, killing it");
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "engine already gone");
            }
        }
        tracing::debug!(
            kind = %kind,
            input = bytes.len(),
            elapsed = ?started.elapsed(),
            ok = outcome.is_ok(),
            "process call finished"
        );
        outcome
    }
}

fn pipe_missing(name: &str) -> BridgeError {
    BridgeError::Io(std::io::Error::other(format!("engine {name} was not captured")))
}

fn stderr_excerpt(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.len() <= STDERR_EXCERPT {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_EXCERPT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
