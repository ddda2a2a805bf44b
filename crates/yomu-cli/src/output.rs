use std::io::Write;

use owo_colors::OwoColorize;
use yomu_core::{EngineConfig, Extraction, Metadata, MetadataValue, MimeType};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Banner printed before each document when more than one is given.
pub fn print_header(w: &mut dyn Write, input: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", format!("==> {input} <==").bold())
    } else {
        writeln!(w, "==> {input} <==")
    }
}

pub fn print_extraction(
    w: &mut dyn Write,
    extraction: &Extraction,
    json: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    match extraction {
        Extraction::Text(text) | Extraction::Html(text) => {
            write!(w, "{text}")?;
            if !text.ends_with('\n') {
                writeln!(w)?;
            }
            Ok(())
        }
        Extraction::Metadata(metadata) if json => print_metadata_json(w, metadata),
        Extraction::Metadata(metadata) => print_metadata(w, metadata, color),
        Extraction::Mimetype(mime) => print_mimetype(w, mime, color),
    }
}

fn print_metadata(w: &mut dyn Write, metadata: &Metadata, color: ColorMode) -> std::io::Result<()> {
    let width = metadata.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in metadata.iter() {
        let rendered = match value {
            MetadataValue::Single(v) => v.clone(),
            MetadataValue::Multi(vs) => vs.join(", "),
        };
        if color.enabled() {
            writeln!(w, "{:width$}  {}", key.cyan(), rendered)?;
        } else {
            writeln!(w, "{key:width$}  {rendered}")?;
        }
    }
    Ok(())
}

fn print_metadata_json(w: &mut dyn Write, metadata: &Metadata) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, metadata)?;
    writeln!(w)
}

fn print_mimetype(w: &mut dyn Write, mime: &MimeType, color: ColorMode) -> std::io::Result<()> {
    let extensions = mime.extensions.join(", ");
    if color.enabled() {
        writeln!(w, "{}  {}", mime.content_type.green(), extensions.dimmed())
    } else {
        writeln!(w, "{}  {}", mime.content_type, extensions)
    }
}

pub fn print_error(
    w: &mut dyn Write,
    input: &str,
    error: &dyn std::fmt::Display,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {input}: {error}", "error:".red().bold())
    } else {
        writeln!(w, "error: {input}: {error}")
    }
}

/// Resolved engine settings, as `yomu config` shows them.
pub fn print_engine_config(
    w: &mut dyn Write,
    engine: &EngineConfig,
    config_path: Option<&std::path::Path>,
    color: ColorMode,
) -> std::io::Result<()> {
    let rows = [
        (
            "config file",
            config_path.map_or("(none)".to_string(), |p| p.display().to_string()),
        ),
        ("program", engine.program().display().to_string()),
        ("runtime args", engine.runtime_args.join(" ")),
        (
            "engine config",
            engine
                .config_path
                .as_ref()
                .map_or("(none)".to_string(), |p| p.display().to_string()),
        ),
        ("server port", engine.port.to_string()),
        ("startup timeout", format!("{:?}", engine.startup_timeout)),
        ("probe interval", format!("{:?}", engine.probe_interval)),
        (
            "call timeout",
            engine
                .timeout
                .map_or("none".to_string(), |t| format!("{t:?}")),
        ),
    ];
    for (label, value) in rows {
        if color.enabled() {
            writeln!(w, "{:16} {}", label.bold(), value)?;
        } else {
            writeln!(w, "{label:16} {value}")?;
        }
    }
    Ok(())
}
