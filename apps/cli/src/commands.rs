//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use helpsync_core::{
    ItemOutcome, JobState, ProgressReporter, RunMode, RunReport, UploadSelection, files_client,
    run_sync, upload_directory,
};
use helpsync_shared::{
    AppConfig, UploadSummary, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
use helpsync_storage::{JobLog, StatePaths};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// helpsync: keep an indexing service in step with a help center.
#[derive(Parser)]
#[command(
    name = "helpsync",
    version,
    about = "Sync help-center articles to a knowledge-indexing service, uploading only what changed.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.helpsync/helpsync.toml).
    #[arg(long, global = true, env = "HELPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for document files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory for the fingerprint store, job log and upload summary.
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Overrides for the `[source]` config section.
#[derive(Args, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Help-center base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum number of articles to process.
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape, write changed documents, and upload them.
    Run {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Scrape and write changed documents without uploading.
    Scrape {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Upload documents from the data directory.
    Upload {
        /// Upload every document, not just those written by the last run.
        #[arg(long)]
        all: bool,
    },

    /// Show past runs from the job log.
    History {
        /// Number of most recent runs to show.
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "helpsync=info",
        1 => "helpsync=debug",
        _ => "helpsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }

    let Cli {
        config,
        data_dir,
        state_dir,
        command,
        ..
    } = cli;

    let load = |source: &SourceArgs| -> Result<AppConfig> {
        let mut config = match &config {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        apply_overrides(&mut config, source, data_dir.clone(), state_dir.clone());
        Ok(config)
    };

    match command {
        Command::Run { source } => cmd_run(load(&source)?, RunMode::Full).await,
        Command::Scrape { source } => cmd_run(load(&source)?, RunMode::ScrapeOnly).await,
        Command::Upload { all } => cmd_upload(load(&SourceArgs::default())?, all).await,
        Command::History { limit, json } => {
            cmd_history(&load(&SourceArgs::default())?, limit, json)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&load(&SourceArgs::default())?),
        },
    }
}

/// CLI flags take precedence over the config file.
fn apply_overrides(
    config: &mut AppConfig,
    source: &SourceArgs,
    data_dir: Option<PathBuf>,
    state_dir: Option<PathBuf>,
) {
    if let Some(url) = &source.base_url {
        config.source.base_url = url.clone();
    }
    if let Some(max) = source.max_articles {
        config.source.max_articles = max;
    }
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }
    if let Some(dir) = state_dir {
        config.storage.state_dir = dir;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: AppConfig, mode: RunMode) -> Result<()> {
    // Validate API key before any network activity
    if mode == RunMode::Full {
        validate_api_key(&config)?;
    }

    info!(
        base_url = %config.source.base_url,
        max_articles = config.source.max_articles,
        ?mode,
        "starting sync"
    );

    let reporter = CliProgress::new();
    let report = run_sync(&config, mode, &reporter).await?;

    print_report(&report);
    Ok(())
}

async fn cmd_upload(config: AppConfig, all: bool) -> Result<()> {
    let uploader = files_client(&config)?;
    let selection = if all {
        UploadSelection::All
    } else {
        UploadSelection::LastRun
    };

    let reporter = CliProgress::new();
    let summary = upload_directory(&config, &uploader, selection, &reporter).await?;
    reporter.finish();

    print_upload_summary(&summary);
    Ok(())
}

fn cmd_history(config: &AppConfig, limit: usize, json: bool) -> Result<()> {
    let paths = StatePaths::new(&config.storage.state_dir);
    let log = JobLog::load(&paths.job_log, config.storage.log_capacity)?;

    let skip = log.len().saturating_sub(limit);
    let entries: Vec<_> = log.entries().skip(skip).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No runs recorded in {}", paths.job_log.display());
        return Ok(());
    }

    println!(
        "{:<26} {:>6} {:>8} {:>8} {:>7} {:>9}",
        "TIMESTAMP", "ADDED", "UPDATED", "SKIPPED", "FAILED", "UPLOADED"
    );
    for entry in entries {
        let s = &entry.stats;
        println!(
            "{:<26} {:>6} {:>8} {:>8} {:>7} {:>9}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            s.added,
            s.updated,
            s.skipped,
            s.failed,
            s.uploaded
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &RunReport) {
    let stats = report.stats();

    println!();
    println!("  Sync complete.");
    println!("  Added:     {}", stats.added);
    println!("  Updated:   {}", stats.updated);
    println!("  Skipped:   {}", stats.skipped);
    println!("  Failed:    {}", stats.failed);
    if let Some(uploads) = &report.uploads {
        println!("  Uploaded:  {} ({} failed)", uploads.total_files, uploads.failed);
        println!(
            "  Chunks:    {} (avg {:.1}/file)",
            uploads.total_chunks,
            uploads.average_chunks()
        );
    }
    println!("  Run:       {}", report.entry.run_id);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            ItemOutcome::Failed { title, reason } => Some((title, reason)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        println!();
        println!("  Failed articles:");
        for (title, reason) in failures {
            println!("    - {title}: {reason}");
        }
    }
    println!();
}

fn print_upload_summary(summary: &UploadSummary) {
    println!();
    println!("  Upload complete.");
    println!("  Files:     {}", summary.total_files);
    println!("  Failed:    {}", summary.failed);
    println!(
        "  Chunks:    {} (avg {:.1}/file)",
        summary.total_chunks,
        summary.average_chunks()
    );
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn state(&self, state: JobState) {
        match state {
            JobState::Done | JobState::Failed => self.finish(),
            _ => self.spinner.set_message(capitalize(state.as_str())),
        }
    }

    fn article_fetched(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {title}"));
    }

    fn article_processed(&self, outcome: &ItemOutcome, current: usize, total: usize) {
        let label = match outcome {
            ItemOutcome::Written { filename, change } => format!("{change} {filename}"),
            ItemOutcome::Unchanged { filename } => format!("unchanged {filename}"),
            ItemOutcome::Failed { title, .. } => format!("failed {title}"),
        };
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {label}"));
    }

    fn done(&self, _report: &RunReport) {
        self.finish();
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
