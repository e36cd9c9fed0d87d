use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mediastamp_core::{
    AuditControl, AuditOptions, BatchReport, CancellationToken, Collaborators, Counter,
    ExecutionMode, Progress,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mediastamp",
    version,
    about = "Audit media files: fix extensions, reconcile timestamps, rename to canonical names"
)]
struct Cli {
    /// Root folder to audit
    root: PathBuf,

    /// Compute and report everything, change nothing
    #[arg(short, long)]
    preview: bool,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Worker threads (default: one per CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Log filter when RUST_LOG is unset (e.g. "warn", "mediastamp_core=debug")
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the final counters as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || {
            warn!("interrupt received, finishing files in flight");
            token.cancel();
        })
        .context("failed to install Ctrl+C handler")?;
    }

    let mut options = AuditOptions::new(cli.root);
    options.recursive = cli.recursive;
    options.mode = ExecutionMode::from_preview(cli.preview);
    options.workers = cli.workers;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {elapsed_precise}")
            .context("invalid progress template")?,
    );

    let on_progress = |p: &Progress| {
        bar.set_length(p.total);
        bar.set_position(p.current + 1);
        let pct = if p.total == 0 {
            100.0
        } else {
            (p.current + 1) as f64 * 100.0 / p.total as f64
        };
        bar.println(format!("[{}] {}/{} ({:.1}%) {}", p.stage, p.current + 1, p.total, pct, p.message));
    };

    let report = mediastamp_core::audit_with_control(
        &options,
        &AuditControl::new().with_cancel_token(token),
        &Collaborators::default(),
        &on_progress,
    )
    .with_context(|| format!("cannot audit {}", options.root.display()))?;
    bar.finish_and_clear();

    print_summary(&report);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    let preview = !report.mode.applies();
    eprintln!(
        "Done{}: {} of {} files processed in {:.2}s{}",
        if preview { " (preview)" } else { "" },
        report.get(Counter::Processed),
        report.total,
        report.elapsed.as_secs_f64(),
        if report.cancelled { ", interrupted" } else { "" },
    );

    let (applied, observed): (Vec<_>, Vec<_>) = report
        .counters
        .iter()
        .partition(|(counter, _)| counter.is_applied_change());

    eprintln!("  observed:");
    for (counter, value) in observed {
        if counter == Counter::DryRun && !preview {
            continue;
        }
        eprintln!("    {:<24} {}", counter.name(), value);
    }
    eprintln!("  applied:");
    for (counter, value) in applied {
        eprintln!("    {:<24} {}", counter.name(), value);
    }
    if preview {
        eprintln!(
            "  {} change(s) would be made; run without --preview to apply",
            report.get(Counter::DryRun)
        );
    }
    let failed = report.get(Counter::Failed);
    if failed > 0 {
        eprintln!("  {failed} file(s) FAILED, see warnings above");
    }
}
