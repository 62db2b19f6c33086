/// make_evoked: average every configured condition of every subject/session
/// and write condition averages plus contrasts to `*_ave.safetensors`.
///
/// Unit failures are logged and do not stop the batch. With `--strict` the
/// process exits non-zero if any unit failed.
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evoked::{BatchRunner, FileStore, PipelineConfig, SummaryViewer};

#[derive(Parser, Debug)]
#[command(name = "make_evoked", about = "Create evoked data from epochs")]
struct Args {
    /// Pipeline configuration (TOML).
    #[arg(long)]
    config: PathBuf,

    /// Worker threads (overrides `n_jobs` from the config; 0 = one per core).
    #[arg(long)]
    n_jobs: Option<usize>,

    /// Only process these subjects (repeatable).
    #[arg(long = "subject")]
    subjects: Vec<String>,

    /// Log a peak summary of every written record.
    #[arg(long)]
    interactive: bool,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Exit with an error if any unit failed.
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut cfg = PipelineConfig::load(&args.config)?;
    if let Some(n) = args.n_jobs {
        cfg.n_jobs = n;
    }
    if !args.subjects.is_empty() {
        cfg.subjects = args.subjects.clone();
    }
    cfg.interactive |= args.interactive;

    let store = FileStore::from_config(&cfg);
    let viewer = SummaryViewer;
    let report = BatchRunner::new(&cfg, &store, &store)
        .with_viewer(&viewer)
        .run()?;

    for o in report.failures() {
        info!(unit = %o.unit, state = ?o.failed_in, "failed");
    }
    println!("{} of {} units processed", report.n_ok(), report.outcomes.len());

    if args.strict && !report.all_ok() {
        bail!("{} unit(s) failed", report.outcomes.len() - report.n_ok());
    }
    Ok(())
}
