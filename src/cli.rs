use crate::download::{save_all, SavedClips};
use crate::model::{ClientConfig, UiCommand, VideoAsset, WorkflowEvent, WorkflowPhase};
use crate::orchestrator::run_controller;
use crate::render::{self, ResultCard};
use crate::service::HttpHighlightService;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sportsight",
    version,
    about = "Upload a match video, generate highlights, and fetch the clips"
)]
pub struct Cli {
    /// Video file to upload
    pub video: Option<PathBuf>,

    /// Base URL of the highlight service
    #[arg(long, default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Print a JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print status lines and result cards, then exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Stop after the upload is accepted
    #[arg(long)]
    pub upload_only: bool,

    /// Save every clip into this directory once results are ready
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// TCP connect timeout (e.g. 5s); requests themselves are never timed out
    #[arg(long)]
    pub connect_timeout: Option<humantime::Duration>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            init_tracing(args.verbose);
            return run_headless(args, false).await;
        }
    }

    init_tracing(args.verbose);
    let json = args.json;
    run_headless(args, json).await
}

/// Install the stderr log subscriber. Not used by the TUI, which owns the terminal.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sportsight_client=debug"
    } else {
        "sportsight_client=warn"
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("sportsight/{}", env!("CARGO_PKG_VERSION")),
        connect_timeout: args.connect_timeout.map(Duration::from),
    }
}

/// Final state of a scripted run, printed by `--json`.
#[derive(Debug, Serialize)]
struct Report {
    completed_utc: String,
    config: ClientConfig,
    phase: WorkflowPhase,
    status: Vec<String>,
    results: Vec<ResultCard>,
    downloads: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_error: Option<String>,
}

/// Act as the user for one upload -> run -> results cycle and report what happened.
async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let path = args
        .video
        .as_deref()
        .context("a VIDEO file is required with --text or --json")?;
    let asset = VideoAsset::load(path).await?;

    let cfg = build_config(&args);
    let service = Arc::new(HttpHighlightService::new(&cfg)?);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = tokio::spawn(run_controller(service.clone(), event_tx, cmd_rx));
    let (out_tx, out_handle) = spawn_output_writer();

    let _ = cmd_tx.send(UiCommand::SubmitUpload(Some(asset)));

    let mut status = Vec::new();
    let mut cards: Vec<ResultCard> = Vec::new();

    // The channel closes when the controller returns.
    while let Some(ev) = event_rx.recv().await {
        match ev {
            WorkflowEvent::Status(s) => {
                if !json {
                    let _ = out_tx.send(OutputLine::Stderr(s.clone()));
                }
                status.push(s);
            }
            WorkflowEvent::StartProcessingEnabled(true) => {
                let next = if args.upload_only {
                    UiCommand::Quit
                } else {
                    UiCommand::StartProcessing
                };
                let _ = cmd_tx.send(next);
            }
            WorkflowEvent::StartProcessingEnabled(false) => {}
            WorkflowEvent::PhaseChanged(phase) => {
                if matches!(
                    phase,
                    WorkflowPhase::ResultsReady | WorkflowPhase::Failed { .. }
                ) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
            }
            WorkflowEvent::ClearResults => cards.clear(),
            WorkflowEvent::Render(set) => {
                cards = render::cards(&set);
                if !json {
                    for line in card_lines(&cards) {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                }
            }
        }
    }

    let phase = controller.await.context("controller task failed")?;

    let mut downloads = SavedClips::default();
    if let (WorkflowPhase::ResultsReady, Some(dir)) = (&phase, args.download_dir.as_deref()) {
        downloads = save_all(service.as_ref(), &cards, dir).await;
        if !json {
            for p in &downloads.paths {
                let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
            }
            if let Some(e) = &downloads.error {
                let _ = out_tx.send(OutputLine::Stderr(format!("Download failed: {e:#}")));
            }
        }
    }

    if json {
        let report = Report {
            completed_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            config: cfg,
            phase: phase.clone(),
            status,
            results: cards,
            downloads: downloads.paths,
            download_error: downloads.error.as_ref().map(|e| format!("{e:#}")),
        };
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }

    drop(out_tx);
    let _ = out_handle.await;

    if let Some(e) = downloads.error {
        return Err(e.context("clip download failed"));
    }
    match phase {
        WorkflowPhase::Failed { stage, message } => Err(anyhow::anyhow!(
            "{} stage failed: {}",
            stage.as_str(),
            message
        )),
        _ => Ok(()),
    }
}

/// Human-readable lines for a rendered result set.
fn card_lines(cards: &[ResultCard]) -> Vec<String> {
    let mut lines = Vec::with_capacity(cards.len() * 3);
    for card in cards {
        lines.push(format!("{}. {}", card.index, card.caption));
        lines.push(format!("   preview:  {}", card.preview_src));
        lines.push(format!(
            "   download: {} -> {}",
            card.download_href, card.download_filename
        ));
    }
    lines
}
