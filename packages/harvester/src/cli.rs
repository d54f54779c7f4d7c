//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{self, Selection};
use crate::config::Settings;
use crate::error::Result;
use crate::http::create_client;
use crate::ingest::{IngestSummary, Progress, ProgressSink};
use crate::logging;
use crate::sync;

/// IBPTax harvester - Convert IBPTax rate tables into a versioned JSON shard tree.
#[derive(Parser)]
#[command(name = "ibptax-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root of the shard tree
    #[arg(short, long, global = true, default_value = ".")]
    pub output: PathBuf,

    /// Log file (default: <OUTPUT>/process.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process the newest remote release, or pick local tables when nothing new is published.
    Run(RunArgs),

    /// Download the newest remote release into the cache without processing it.
    Sync {
        /// Remote listing endpoint
        #[arg(long)]
        listing_url: Option<String>,
    },

    /// Process the given table files.
    Process {
        /// Table files (IBPTax<UF><version>.csv)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Directory scanned for local tables (default: OUTPUT)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Remote listing endpoint
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Skip the remote check and go straight to local tables
    #[arg(long)]
    pub no_sync: bool,

    /// Answer to the selection prompt: a file index or A for all
    #[arg(short, long)]
    pub select: Option<String>,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    run_with(Cli::parse())
}

/// Run an already parsed command line.
///
/// Only startup problems, such as an unopenable log file, are returned as
/// errors. Everything after that is logged and the run completes.
pub fn run_with(cli: Cli) -> Result<()> {
    let mut settings = Settings::new(cli.output);
    if let Some(log_file) = cli.log_file {
        settings.log_file = log_file;
    }
    logging::init(&settings.log_file)?;
    tracing::info!(output = %settings.out_root.display(), "Run started");

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            if let Some(input) = args.input.clone() {
                settings.input_dir = input;
            }
            if let Some(url) = args.listing_url.clone() {
                settings.listing_url = url;
            }
            run_command(&settings, args);
        }
        Commands::Sync { listing_url } => {
            if let Some(url) = listing_url {
                settings.listing_url = url;
            }
            sync_release(&settings);
        }
        Commands::Process { files } => process_command(&settings, &files),
    }

    tracing::info!("Run finished");
    Ok(())
}

/// Execute the default flow: remote release first, local picker otherwise.
///
/// Nothing in here ends the run early with an error. Failures are logged
/// and the run reports whatever it managed to process.
fn run_command(settings: &Settings, args: RunArgs) {
    let files = if args.no_sync {
        Vec::new()
    } else {
        sync_release(settings)
    };
    if !files.is_empty() {
        process_command(settings, &files);
        return;
    }

    let local = match batch::local_tables(&settings.input_dir) {
        Ok(local) => local,
        Err(e) => {
            println!("{} {}", style("Cannot list local tables:").red().bold(), e);
            tracing::error!(dir = %settings.input_dir.display(), error = %e, "Cannot list local tables");
            process_command(settings, &[]);
            return;
        }
    };
    if local.is_empty() {
        println!(
            "{}",
            style("No local tables found and no new remote release.").yellow()
        );
        tracing::info!(dir = %settings.input_dir.display(), "Nothing to process");
        return;
    }

    println!("{}", style("Local tables:").bold());
    for (i, file) in local.iter().enumerate() {
        println!("  {} {}", style(format!("[{i}]")).cyan(), display_name(file));
    }
    println!("  {} all files", style("[A]").cyan());

    let input = match args.select {
        Some(input) => input,
        None => prompt_selection().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Cannot read selection");
            String::new()
        }),
    };
    match Selection::parse(&input, local.len()) {
        Ok(selection) => process_command(settings, &selection.apply(&local)),
        Err(e) => {
            println!("{} {}", style("Invalid selection:").red().bold(), input.trim());
            tracing::warn!(error = %e, "Invalid selection, nothing processed");
        }
    }
}

/// Check the remote listing and download a newer release.
///
/// Any failure is logged and yields no files.
fn sync_release(settings: &Settings) -> Vec<PathBuf> {
    let client = match create_client() {
        Ok(client) => client,
        Err(e) => {
            println!("{} {}", style("Remote sync unavailable:").red().bold(), e);
            tracing::error!(error = %e, "Cannot build HTTP client");
            return Vec::new();
        }
    };

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Checking remote releases...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = sync::sync(&client, &settings.listing_url, &settings.out_root);
    pb.finish_and_clear();

    let local = outcome.local_version.as_deref().unwrap_or("none");
    match &outcome.remote_latest {
        Some(remote) if !outcome.downloaded.is_empty() => println!(
            "{} {} ({} files, local: {})",
            style("New release downloaded:").green().bold(),
            style(remote).cyan(),
            outcome.downloaded.len(),
            local
        ),
        Some(remote) if sync::is_newer(remote, outcome.local_version.as_deref()) => println!(
            "{} {}",
            style("Could not download release").red().bold(),
            style(remote).cyan()
        ),
        Some(remote) => println!(
            "{} {} (remote: {})",
            style("Local release is up to date:").green(),
            local,
            remote
        ),
        None => println!("{}", style("No remote release available.").yellow()),
    }

    outcome.downloaded
}

/// Process files with a progress bar and print the totals.
fn process_command(settings: &Settings, files: &[PathBuf]) {
    let mut progress = BarProgress::default();
    let summary = batch::process_all(files, &settings.out_root, &mut progress);

    println!();
    println!(
        "{} {} files, {} records",
        style("Processed").bold(),
        summary.files.len(),
        style(summary.records_written()).green()
    );
    if summary.failed() > 0 {
        println!("  Failed: {}", style(summary.failed()).red().bold());
    }
}

fn prompt_selection() -> Result<String> {
    let term = Term::stdout();
    term.write_str("Select a file index, or A for all: ")?;
    Ok(term.read_line()?)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Terminal progress bar, one per file.
#[derive(Default)]
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressSink for BarProgress {
    fn on_start(&mut self, file: &Path, rows_total: usize) {
        let bar = ProgressBar::new(rows_total as u64);
        #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} rows, {msg} (ETA {eta})")
                .expect("valid template")
                .progress_chars("=> "),
        );
        bar.set_prefix(display_name(file));
        bar.set_message("0 records");
        self.bar = Some(bar);
    }

    fn on_progress(&mut self, progress: &Progress) {
        if let Some(bar) = &self.bar {
            bar.set_position(progress.rows_done as u64);
            bar.set_message(format!("{} records", progress.written));
        }
    }

    fn on_finish(&mut self, summary: &IngestSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let name = display_name(&summary.file);
        match &summary.error {
            None => println!(
                "  {} {} -> {}/{}: {} records in {:.1}s",
                style("✓").green(),
                name,
                summary.version,
                summary.jurisdiction,
                summary.records_written,
                summary.elapsed.as_secs_f64()
            ),
            Some(error) => println!(
                "  {} {}: {} (after {} records)",
                style("✗").red(),
                name,
                error,
                summary.records_written
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_default_command() {
        let cli = Cli::parse_from(["ibptax-harvester"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.output, PathBuf::from("."));
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from([
            "ibptax-harvester",
            "run",
            "--no-sync",
            "--select",
            "A",
            "--input",
            "tables",
            "--output",
            "out",
        ]);

        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert!(args.no_sync);
        assert_eq!(args.select.as_deref(), Some("A"));
        assert_eq!(args.input, Some(PathBuf::from("tables")));
        assert_eq!(cli.output, PathBuf::from("out"));
    }

    #[test]
    fn test_cli_parse_process() {
        let cli = Cli::parse_from([
            "ibptax-harvester",
            "--log-file",
            "run.log",
            "process",
            "IBPTaxSP25.2.csv",
            "IBPTaxRJ25.2.csv",
        ]);

        let Some(Commands::Process { files }) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_cli_process_requires_files() {
        assert!(Cli::try_parse_from(["ibptax-harvester", "process"]).is_err());
    }

    #[test]
    fn test_cli_parse_sync() {
        let cli = Cli::parse_from([
            "ibptax-harvester",
            "sync",
            "--listing-url",
            "http://localhost/tables",
        ]);

        let Some(Commands::Sync { listing_url }) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(listing_url.as_deref(), Some("http://localhost/tables"));
    }
}
