//! Stand-in for the content-analysis engine.
//!
//! Speaks the same command line as the real engine (`-t`, `-h`, `-m -j`,
//! `--config=`, `--server --port=`), reads documents from stdin or from
//! half-closed TCP connections, and answers with deterministic output
//! derived from the input bytes.

use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use yomu_testkit::{Render, render};

#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Args {
    /// Engine configuration file (accepted, not read)
    #[arg(long)]
    config: Option<String>,

    /// Listen on localhost instead of reading stdin
    #[arg(long)]
    server: bool,

    #[arg(long, default_value_t = 9293)]
    port: u16,

    #[arg(short = 't')]
    text: bool,

    #[arg(short = 'h')]
    html: bool,

    #[arg(short = 'm')]
    metadata: bool,

    #[arg(short = 'j')]
    json: bool,

    /// Sleep before answering each document
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

impl Args {
    fn render(&self) -> Render {
        if self.metadata || self.json {
            Render::MetadataJson
        } else if self.html {
            Render::Html
        } else {
            Render::Text
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mode = args.render();
    let delay = Duration::from_millis(args.delay_ms);

    if !args.server {
        let mut input = Vec::new();
        tokio::io::stdin().read_to_end(&mut input).await?;
        tokio::time::sleep(delay).await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&render(mode, &input)).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => {
                let (mut conn, _) = accepted?;
                tokio::spawn(async move {
                    let mut input = Vec::new();
                    if conn.read_to_end(&mut input).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(delay).await;
                    let _ = conn.write_all(&render(mode, &input)).await;
                    let _ = conn.shutdown().await;
                });
            }
        }
    }
    Ok(())
}
