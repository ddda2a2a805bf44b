use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use yomu_core::config_file;
use yomu_core::{EngineConfig, Extractor, OutputKind, ServerHandle};
use yomu_ingest::Document;

mod logging;
mod output;

use output::ColorMode;

/// Read text, HTML, metadata and media types out of documents using an
/// external content-analysis engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plain text of each document
    Text(ExtractArgs),
    /// Print the HTML rendition of each document
    Html(ExtractArgs),
    /// Print the metadata of each document
    Metadata {
        #[command(flatten)]
        args: ExtractArgs,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the registered media type of each document
    Mimetype(ExtractArgs),
    /// Show the resolved engine configuration
    Config,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Files, http(s) URLs, or `-` for stdin
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Start one engine server for the whole batch instead of a process per document
    #[arg(long)]
    server: bool,

    /// Server port (default from config, then 9293)
    #[arg(long)]
    port: Option<u16>,

    /// Per-document timeout in seconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Engine configuration file passed through to the engine
    #[arg(long)]
    engine_config: Option<PathBuf>,
}

impl ExtractArgs {
    /// CLI flags over config files and environment.
    fn engine_config(&self) -> EngineConfig {
        let mut engine = config_file::resolve_engine_config();
        if let Some(port) = self.port {
            engine.port = port;
        }
        if let Some(secs) = self.timeout {
            engine.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(ref path) = self.engine_config {
            engine.config_path = Some(path.clone());
        }
        engine
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let color = ColorMode(!cli.no_color && std::env::var_os("NO_COLOR").is_none());

    match cli.command {
        Command::Text(args) => extract(OutputKind::Text, args, false, color).await,
        Command::Html(args) => extract(OutputKind::Html, args, false, color).await,
        Command::Metadata { args, json } => extract(OutputKind::Metadata, args, json, color).await,
        Command::Mimetype(args) => extract(OutputKind::Mimetype, args, false, color).await,
        Command::Config => show_config(color),
    }
}

async fn extract(
    kind: OutputKind,
    args: ExtractArgs,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let engine = args.engine_config();

    let server = if args.server {
        Some(ServerHandle::start(&engine, kind, None).await?)
    } else {
        None
    };
    let extractor = match &server {
        Some(handle) => Extractor::new(Arc::new(handle.socket_call())).with_timeout(engine.timeout),
        None => Extractor::process(engine.clone()),
    };

    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    let many = args.inputs.len() > 1;
    let mut failures = 0usize;

    for input in &args.inputs {
        let doc = if input == "-" {
            Ok(Document::from_reader(tokio::io::stdin(), extractor.clone()))
        } else {
            Document::open(input, extractor.clone())
        };
        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                failures += 1;
                output::print_error(&mut stderr, input, &e, color)?;
                continue;
            }
        };

        if many {
            output::print_header(&mut stdout, input, color)?;
        }
        match doc.read(kind).await {
            Ok(extraction) => output::print_extraction(&mut stdout, &extraction, json, color)?,
            Err(e) => {
                failures += 1;
                tracing::debug!(input = %input, error = ?e, "extraction failed");
                output::print_error(&mut stderr, input, &e, color)?;
            }
        }
        stdout.flush()?;
    }

    if let Some(handle) = server {
        handle.shutdown(Duration::from_secs(5)).await?;
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} documents failed", args.inputs.len());
    }
    Ok(())
}

fn show_config(color: ColorMode) -> anyhow::Result<()> {
    let engine = config_file::resolve_engine_config();
    let path = config_file::config_path().filter(|p| p.exists());
    let mut stdout = std::io::stdout().lock();
    output::print_engine_config(&mut stdout, &engine, path.as_deref(), color)?;

    let files = config_file::load_config();
    if files != config_file::ConfigFile::default() {
        writeln!(stdout)?;
        write!(stdout, "{}", toml::to_string_pretty(&files)?)?;
    }
    Ok(())
}
