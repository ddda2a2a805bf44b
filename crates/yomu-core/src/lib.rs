use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub mod bridge;
pub mod command;
pub mod config_file;
pub mod extractor;
pub mod metadata;
pub mod mime;
pub mod mock;
pub mod process;
pub mod server;
pub mod socket;
pub mod timeout;

// Re-export for convenience
pub use bridge::{AutoBridge, Bridge, BridgeFuture};
pub use command::{DEFAULT_SERVER_PORT, EngineCommand, locate_runtime};
pub use extractor::{Extraction, Extractor};
pub use metadata::{Metadata, MetadataValue};
pub use mime::{GuessRegistry, MimeRegistry, MimeType};
pub use process::ProcessCall;
pub use server::{ServerHandle, ServerSlot};
pub use socket::SocketCall;
pub use timeout::run_with_timeout;

/// What the engine should produce for a document.
///
/// The kind selects both the engine's output flag and the shape of the
/// decoded [`Extraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Text,
    Html,
    Metadata,
    /// Metadata output, resolved to a registered type via `Content-Type`.
    Mimetype,
}

impl OutputKind {
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Text,
        OutputKind::Html,
        OutputKind::Metadata,
        OutputKind::Mimetype,
    ];

    /// Engine command-line flags requesting this kind of output.
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            OutputKind::Text => &["-t"],
            OutputKind::Html => &["-h"],
            OutputKind::Metadata | OutputKind::Mimetype => &["-m", "-j"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Text => "text",
            OutputKind::Html => "html",
            OutputKind::Metadata => "metadata",
            OutputKind::Mimetype => "mimetype",
        }
    }

    /// True when both kinds make the engine emit the same representation.
    pub fn same_output(self, other: OutputKind) -> bool {
        self.flags() == other.flags()
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputKind::Text),
            "html" => Ok(OutputKind::Html),
            "metadata" | "meta" => Ok(OutputKind::Metadata),
            "mimetype" | "mime" => Ok(OutputKind::Mimetype),
            other => Err(format!("unknown output kind `{other}`")),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to start engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to engine: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not connect to engine server on port {port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("engine call timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine exited with {status}: {stderr}")]
    EngineExited {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("port {0} already accepts connections; another server is listening")]
    PortInUse(u16),
    #[error("engine server did not accept connections on port {port} within {waited:?}")]
    StartupTimeout { port: u16, waited: Duration },
    #[error("server on port {port} produces {server} output, cannot serve a {requested} request")]
    KindMismatch {
        port: u16,
        server: OutputKind,
        requested: OutputKind,
    },
    #[error("malformed metadata JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("metadata response is not a JSON object")]
    NotAnObject,
    #[error("invalid Creation-Date `{0}`")]
    InvalidDate(String),
    #[error("metadata has no Content-Type field")]
    MissingContentType,
    #[error("no registered MIME type for `{0}`")]
    UnknownMimeType(String),
}

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout(_))
    }
}

/// How to launch the external engine and talk to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Environment variable naming the runtime home (`<home>/bin/<executable>`).
    /// `None` always uses `executable` as given.
    pub runtime_home_var: Option<String>,
    pub executable: String,
    /// Arguments placed before the engine flags, e.g. `-jar tika-app.jar`.
    pub runtime_args: Vec<String>,
    /// Engine configuration file, passed as `--config=<path>`.
    pub config_path: Option<PathBuf>,
    /// Port used by server mode when none is given.
    pub port: u16,
    pub startup_timeout: Duration,
    pub probe_interval: Duration,
    /// Default deadline for a single extraction call.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runtime_home_var: Some(command::DEFAULT_RUNTIME_HOME_VAR.to_string()),
            executable: command::DEFAULT_EXECUTABLE.to_string(),
            runtime_args: command::default_runtime_args(command::DEFAULT_JAR),
            config_path: None,
            port: DEFAULT_SERVER_PORT,
            startup_timeout: Duration::from_secs(30),
            probe_interval: Duration::from_millis(250),
            timeout: None,
        }
    }
}

impl EngineConfig {
    /// Config that runs `program` directly, with no runtime locator or
    /// runtime arguments.
    pub fn direct(program: impl Into<String>) -> Self {
        Self {
            runtime_home_var: None,
            executable: program.into(),
            runtime_args: Vec::new(),
            ..Self::default()
        }
    }
}
