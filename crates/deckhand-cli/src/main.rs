//! Deckhand CLI
//!
//! The `deckhand` command drives the core library against a deck stored as
//! JSON, standing in for a live presentation host.
//!
//! ## Commands
//!
//! - `extract`: Dump shape metadata, optionally publishing it to the backend
//! - `dispatch`: Run deck script fragments against the deck
//! - `run`: Full cycle: snapshot, upload, instruction, dispatch

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use deckhand_core::publish::{publish_per_slide, publish_snapshot};
use deckhand_core::telemetry::init_tracing;
use deckhand_core::metrics::METRICS;
use deckhand_core::{
    extract_snapshot, CodeInput, Collaborators, DeckhandConfig, Dispatcher, FsDocumentFile,
    HttpBackend, MemoryDocument, ScriptRuntime, Session,
};

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Slide shape extraction and code fragment dispatch", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a deckhand.toml config file
    #[arg(short = 'C', long, global = true, env = "DECKHAND_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and environment)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract shape metadata with overlap annotations
    Extract {
        /// Deck JSON file
        #[arg(short, long)]
        deck: PathBuf,

        /// Write records here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Publish the snapshot to the backend
        #[arg(long)]
        publish: bool,
    },

    /// Run code fragments against the deck
    Dispatch {
        /// Deck JSON file
        #[arg(short, long)]
        deck: PathBuf,

        /// Fragment file: plain deck script, or JSON (a string or an object keyed by slide index)
        #[arg(short, long)]
        code: PathBuf,

        /// Do not write the edited deck back
        #[arg(long)]
        dry_run: bool,
    },

    /// Snapshot, upload, request code for an instruction and dispatch it
    Run {
        /// Deck JSON file
        #[arg(short, long)]
        deck: PathBuf,

        /// What to change, in plain language
        #[arg(short, long)]
        instruction: String,

        /// Document file to upload (default: the deck file)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let mut config = match &cli.config {
        Some(path) => DeckhandConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DeckhandConfig::from_env().context("Invalid deckhand environment")?,
    };
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    let result = match cli.command {
        Commands::Extract { deck, out, publish } => {
            cmd_extract(&config, &deck, out.as_deref(), publish).await
        }
        Commands::Dispatch {
            deck,
            code,
            dry_run,
        } => cmd_dispatch(&config, &deck, &code, dry_run).await,
        Commands::Run {
            deck,
            instruction,
            file,
        } => cmd_run(&config, &deck, &instruction, file.as_deref()).await,
    };

    METRICS.flush();
    result
}

async fn open_deck(path: &Path) -> Result<Arc<MemoryDocument>> {
    let doc = MemoryDocument::open(path)
        .await
        .with_context(|| format!("Failed to open deck {}", path.display()))?;
    Ok(Arc::new(doc))
}

fn backend(config: &DeckhandConfig) -> Result<Arc<HttpBackend>> {
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    Ok(Arc::new(backend))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_extract(
    config: &DeckhandConfig,
    deck: &Path,
    out: Option<&Path>,
    publish: bool,
) -> Result<()> {
    let host = open_deck(deck).await?;
    let report = extract_snapshot(host)
        .await
        .context("Failed to load the slide collection")?;

    info!(
        records = report.records.len(),
        skipped = report.skipped_shapes.len(),
        failed_slides = report.failed_slides.len(),
        "extraction complete"
    );

    match out {
        Some(path) => {
            let json = serde_json::to_string_pretty(&report.records)?;
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ {} records written to {}", report.records.len(), path.display());
        }
        None => print_json(&report.records)?,
    }

    if publish {
        let backend = backend(config)?;
        let outcomes = if config.per_slide {
            publish_per_slide(backend.as_ref(), &config.snapshot, &report.records).await
        } else {
            vec![publish_snapshot(backend.as_ref(), &config.snapshot, &report.records).await]
        };
        let failed = outcomes.iter().filter(|o| !o.succeeded).count();
        for outcome in outcomes.iter().filter(|o| !o.succeeded) {
            warn!(
                destination = %outcome.destination,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "publish failed"
            );
        }
        if failed > 0 {
            bail!("{failed} of {} snapshot(s) failed to publish", outcomes.len());
        }
        eprintln!("✓ Published {} snapshot(s)", outcomes.len());
    }

    Ok(())
}

fn read_code(path: &Path) -> Result<CodeInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read code file {}", path.display()))?;
    // Anything that is not JSON is a plain script.
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => serde_json::from_value(value)
            .with_context(|| format!("Invalid code mapping in {}", path.display())),
        Err(_) => Ok(CodeInput::Single(text)),
    }
}

async fn cmd_dispatch(
    config: &DeckhandConfig,
    deck: &Path,
    code: &Path,
    dry_run: bool,
) -> Result<()> {
    let host = open_deck(deck).await?;
    let input = read_code(code)?;

    let dispatcher = Dispatcher::new(
        host.clone(),
        Arc::new(ScriptRuntime::new()),
        config.dispatch_config(),
    );
    let result = dispatcher.dispatch(input).await;
    print_json(&result)?;

    if dry_run {
        info!("dry run: deck left unchanged on disk");
    } else {
        host.save(deck)
            .await
            .with_context(|| format!("Failed to save deck {}", deck.display()))?;
    }

    if !result.overall_succeeded {
        let failed = result.failed().count();
        bail!("{failed} of {} unit(s) failed", result.outcomes.len());
    }
    Ok(())
}

async fn cmd_run(
    config: &DeckhandConfig,
    deck: &Path,
    instruction: &str,
    file: Option<&Path>,
) -> Result<()> {
    let host = open_deck(deck).await?;
    let backend = backend(config)?;
    let file = FsDocumentFile::new(file.unwrap_or(deck), config.slice_size);

    let collaborators = Collaborators {
        snapshots: backend.clone(),
        uploader: backend.clone(),
        file: Arc::new(file),
        instructions: backend,
    };
    let session = Session::new(
        host.clone(),
        collaborators,
        Arc::new(ScriptRuntime::new()),
        config.clone(),
    );

    let report = session.run(instruction).await;
    print_json(&report)?;

    if report.dispatch.is_some() {
        host.save(deck)
            .await
            .with_context(|| format!("Failed to save deck {}", deck.display()))?;
    }
    if !report.succeeded() {
        bail!("instruction was not fully applied");
    }
    Ok(())
}
