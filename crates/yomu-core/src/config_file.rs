use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EngineConfig;
use crate::command::default_runtime_args;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub engine: Option<EngineSection>,
    pub server: Option<ServerSection>,
    pub extract: Option<ExtractSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    pub runtime_home_var: Option<String>,
    pub executable: Option<String>,
    pub jar: Option<String>,
    /// Replaces the headless `-jar <jar>` arguments entirely.
    pub runtime_args: Option<Vec<String>>,
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub startup_timeout_secs: Option<u64>,
    pub probe_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractSection {
    pub timeout_secs: Option<u64>,
}

/// Platform config directory path: `<config_dir>/yomu/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("yomu").join("config.toml"))
}

/// Load config by cascading CWD `.yomu.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".yomu.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_engine = base.engine.unwrap_or_default();
    let engine = overlay.engine.unwrap_or_default();
    let base_server = base.server.unwrap_or_default();
    let server = overlay.server.unwrap_or_default();
    let base_extract = base.extract.unwrap_or_default();
    let extract = overlay.extract.unwrap_or_default();

    ConfigFile {
        engine: Some(EngineSection {
            runtime_home_var: engine.runtime_home_var.or(base_engine.runtime_home_var),
            executable: engine.executable.or(base_engine.executable),
            jar: engine.jar.or(base_engine.jar),
            runtime_args: engine.runtime_args.or(base_engine.runtime_args),
            config_path: engine.config_path.or(base_engine.config_path),
        }),
        server: Some(ServerSection {
            port: server.port.or(base_server.port),
            startup_timeout_secs: server
                .startup_timeout_secs
                .or(base_server.startup_timeout_secs),
            probe_interval_ms: server.probe_interval_ms.or(base_server.probe_interval_ms),
        }),
        extract: Some(ExtractSection {
            timeout_secs: extract.timeout_secs.or(base_extract.timeout_secs),
        }),
    }
}

/// Environment overrides: `YOMU_TIKA_JAR`, `YOMU_TIKA_CONFIG`, `YOMU_PORT`,
/// `YOMU_TIMEOUT`.
pub fn from_env() -> ConfigFile {
    from_vars(|key| std::env::var(key).ok())
}

fn from_vars(var: impl Fn(&str) -> Option<String>) -> ConfigFile {
    let nonempty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
    ConfigFile {
        engine: Some(EngineSection {
            jar: nonempty("YOMU_TIKA_JAR"),
            config_path: nonempty("YOMU_TIKA_CONFIG"),
            ..Default::default()
        }),
        server: Some(ServerSection {
            port: nonempty("YOMU_PORT").and_then(|v| v.trim().parse().ok()),
            ..Default::default()
        }),
        extract: Some(ExtractSection {
            timeout_secs: nonempty("YOMU_TIMEOUT").and_then(|v| v.trim().parse().ok()),
        }),
    }
}

impl ConfigFile {
    /// Apply this config over `base`. Unset fields keep `base` values.
    pub fn apply(&self, base: EngineConfig) -> EngineConfig {
        let mut engine = base;
        if let Some(ref section) = self.engine {
            if let Some(ref var) = section.runtime_home_var {
                engine.runtime_home_var = if var.is_empty() {
                    None
                } else {
                    Some(var.clone())
                };
            }
            if let Some(ref exe) = section.executable {
                engine.executable = exe.clone();
            }
            if let Some(ref args) = section.runtime_args {
                engine.runtime_args = args.clone();
            } else if let Some(ref jar) = section.jar {
                engine.runtime_args = default_runtime_args(jar);
            }
            if let Some(ref path) = section.config_path {
                engine.config_path = Some(PathBuf::from(path));
            }
        }
        if let Some(ref section) = self.server {
            if let Some(port) = section.port {
                engine.port = port;
            }
            if let Some(secs) = section.startup_timeout_secs {
                engine.startup_timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = section.probe_interval_ms {
                engine.probe_interval = Duration::from_millis(ms.max(1));
            }
        }
        if let Some(secs) = self.extract.as_ref().and_then(|e| e.timeout_secs) {
            engine.timeout = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }
        engine
    }
}

/// Defaults, then config files, then environment.
pub fn resolve_engine_config() -> EngineConfig {
    let files = load_config();
    let layered = merge(files, from_env());
    layered.apply(EngineConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_toml() {
        let config = ConfigFile {
            engine: Some(EngineSection {
                jar: Some("/opt/tika/tika-app-2.9.jar".to_string()),
                ..Default::default()
            }),
            server: Some(ServerSection {
                port: Some(9999),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let parsed: ConfigFile = toml::from_str("[server]\nport = 1234\n").unwrap();
        assert!(parsed.engine.is_none());
        assert_eq!(parsed.server.unwrap().port, Some(1234));
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            server: Some(ServerSection {
                port: Some(1000),
                startup_timeout_secs: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            server: Some(ServerSection {
                port: Some(2000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let server = merge(base, overlay).server.unwrap();
        assert_eq!(server.port, Some(2000));
        assert_eq!(server.startup_timeout_secs, Some(10));
    }

    #[test]
    fn jar_rewrites_runtime_args() {
        let config = ConfigFile {
            engine: Some(EngineSection {
                jar: Some("/opt/tika.jar".into()),
                config_path: Some("/opt/tika-config.xml".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let engine = config.apply(EngineConfig::default());
        assert_eq!(
            engine.runtime_args,
            vec!["-Djava.awt.headless=true", "-jar", "/opt/tika.jar"]
        );
        assert_eq!(engine.config_path, Some(PathBuf::from("/opt/tika-config.xml")));
    }

    #[test]
    fn explicit_runtime_args_beat_jar() {
        let config = ConfigFile {
            engine: Some(EngineSection {
                jar: Some("/opt/tika.jar".into()),
                runtime_args: Some(vec!["-jar".into(), "/other.jar".into()]),
                runtime_home_var: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let engine = config.apply(EngineConfig::default());
        assert_eq!(engine.runtime_args, vec!["-jar", "/other.jar"]);
        assert_eq!(engine.runtime_home_var, None);
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let mut config = ConfigFile {
            extract: Some(ExtractSection {
                timeout_secs: Some(30),
            }),
            ..Default::default()
        };
        assert_eq!(
            config.apply(EngineConfig::default()).timeout,
            Some(Duration::from_secs(30))
        );
        config.extract = Some(ExtractSection {
            timeout_secs: Some(0),
        });
        assert_eq!(config.apply(EngineConfig::default()).timeout, None);
    }

    #[test]
    fn env_overrides() {
        let env = from_vars(|key| match key {
            "YOMU_PORT" => Some("9400".into()),
            "YOMU_TIMEOUT" => Some(" 15 ".into()),
            "YOMU_TIKA_JAR" => Some("".into()),
            _ => None,
        });
        let engine = env.apply(EngineConfig::default());
        assert_eq!(engine.port, 9400);
        assert_eq!(engine.timeout, Some(Duration::from_secs(15)));
        // Empty jar variable is ignored.
        assert_eq!(engine.runtime_args, EngineConfig::default().runtime_args);
    }

    #[test]
    fn loads_file_and_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("config.toml");
        std::fs::write(&good, "[server]\nport = 9500\n\n[engine]\njar = \"/opt/tika.jar\"\n").unwrap();
        let config = load_from_path(&good).unwrap();
        let engine = config.apply(EngineConfig::default());
        assert_eq!(engine.port, 9500);
        assert_eq!(engine.runtime_args.last().map(String::as_str), Some("/opt/tika.jar"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[server\nport = ").unwrap();
        assert!(load_from_path(&bad).is_none());
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
