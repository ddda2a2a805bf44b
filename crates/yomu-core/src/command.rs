//! Engine invocation: runtime location and command-line construction.
//!
//! Process mode runs `<program> <runtime args> [--config=<path>] <flags>`
//! and server mode inserts `--server --port=<port>` before the flags.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use crate::{EngineConfig, OutputKind};

pub const DEFAULT_SERVER_PORT: u16 = 9293;
pub const DEFAULT_RUNTIME_HOME_VAR: &str = "JAVA_HOME";
pub const DEFAULT_EXECUTABLE: &str = "java";
pub const DEFAULT_JAR: &str = "tika-app.jar";

/// Runtime arguments that launch the engine jar without a display.
pub fn default_runtime_args(jar: &str) -> Vec<String> {
    vec![
        "-Djava.awt.headless=true".to_string(),
        "-jar".to_string(),
        jar.to_string(),
    ]
}

/// Resolve the runtime executable.
///
/// `<$home_var>/bin/<executable>` when the variable is set and non-empty,
/// otherwise the bare executable name for `PATH` lookup.
pub fn locate_runtime(home_var: Option<&str>, executable: &str) -> PathBuf {
    let home = home_var.and_then(std::env::var_os);
    locate_runtime_in(home, executable)
}

fn locate_runtime_in(home: Option<OsString>, executable: &str) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join(executable),
        _ => PathBuf::from(executable),
    }
}

/// A fully built engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl EngineConfig {
    pub fn program(&self) -> PathBuf {
        locate_runtime(self.runtime_home_var.as_deref(), &self.executable)
    }

    /// One-shot invocation reading the document from stdin.
    pub fn process_command(&self, kind: OutputKind) -> EngineCommand {
        let mut args = self.base_args();
        args.extend(kind.flags().iter().map(|f| f.to_string()));
        EngineCommand {
            program: self.program(),
            args,
        }
    }

    /// Long-lived invocation listening on `localhost:<port>`.
    pub fn server_command(&self, kind: OutputKind, port: u16) -> EngineCommand {
        let mut args = self.base_args();
        args.push("--server".to_string());
        args.push(format!("--port={port}"));
        args.extend(kind.flags().iter().map(|f| f.to_string()));
        EngineCommand {
            program: self.program(),
            args,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = self.runtime_args.clone();
        if let Some(ref path) = self.config_path {
            args.push(format!("--config={}", path.display()));
        }
        args
    }
}
