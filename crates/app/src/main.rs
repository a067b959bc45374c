use anyhow::Context;
use clap::Parser;
use papervox_app::config::{EngineKind, PapervoxConfig, ReadingScope};
use papervox_app::runtime::{self, RuntimeOptions};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser, Debug)]
#[command(
    name = "papervox",
    version,
    about = "Read PDF documents aloud with synthesized speech"
)]
struct Cli {
    /// PDF document to load at startup
    document: Option<PathBuf>,

    /// Path to a papervox.toml configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Speech engine to use
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Voice identifier understood by the selected engine
    #[arg(long)]
    voice: Option<String>,

    /// Speaking rate in words per minute
    #[arg(long)]
    rate: Option<u32>,

    /// Read the current page or the whole document
    #[arg(long, value_enum)]
    scope: Option<ReadingScope>,

    /// Output file for audio conversion
    #[arg(long)]
    output: Option<PathBuf>,

    /// Convert the document to an audio file and exit
    #[arg(long)]
    convert: bool,
}

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs").context("failed to create log directory")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "papervox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    // The guard flushes on drop; keep it alive for the process lifetime.
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    tracing::info!("Starting PaperVox");

    let mut config = PapervoxConfig::load(cli.config.as_deref())?;
    config.apply_cli(cli.engine, cli.voice, cli.rate, cli.scope, cli.output);

    if cli.convert && cli.document.is_none() {
        anyhow::bail!("--convert requires a document argument");
    }

    runtime::run(RuntimeOptions {
        config,
        document: cli.document,
        convert_and_exit: cli.convert,
    })
    .await
}
