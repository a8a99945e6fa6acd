use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use foldcmp_common::{
    ensure_config, load_config, AppConfig, ComparisonEvent, DiffReport, Mismatch, RelativePath,
    Side, UnreadablePolicy,
};
use foldcmp_core::{
    ComparisonOutcome, DiffEngine, HtmlReport, ProgressSink, ReportSink, TextTreeReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_SAME: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_DIFFERENT: i32 = 2;

#[derive(Parser)]
#[command(name = "foldcmp")]
#[command(author = "foldcmp Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Structural and content comparison of two directory trees", long_about = None)]
struct Cli {
    /// Only log warnings and errors, no progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two directory trees
    Compare(CompareArgs),

    /// Show the configuration file location
    Config {
        /// Write a default configuration file when none exists
        #[arg(long)]
        init: bool,

        /// Use the configuration file next to the executable
        #[arg(long)]
        portable: bool,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// First root
    root1: PathBuf,

    /// Second root
    root2: PathBuf,

    /// Skip the content verification pass
    #[arg(long)]
    no_verify: bool,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Descend into symlinked directories
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Number of verification workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// How a common file unreadable on both sides is judged
    #[arg(long, value_enum)]
    unreadable_policy: Option<PolicyArg>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Write an HTML report per non-empty category
    #[arg(long)]
    html: bool,

    /// Directory for HTML reports (defaults to temp files)
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Both sides unreadable compare equal
    Equal,
    /// Both sides unreadable is a mismatch
    Mismatch,
}

impl From<PolicyArg> for UnreadablePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Equal => UnreadablePolicy::TreatAsEqual,
            PolicyArg::Mismatch => UnreadablePolicy::TreatAsMismatch,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean on stdout
    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let code = match cli.command {
        Commands::Compare(args) => match run_compare(args, cli.quiet) {
            Ok(true) => EXIT_DIFFERENT,
            Ok(false) => EXIT_SAME,
            Err(e) => {
                error!("Comparison failed: {:#}", e);
                EXIT_ERROR
            }
        },
        Commands::Config { init, portable } => match run_config(init, portable) {
            Ok(()) => EXIT_SAME,
            Err(e) => {
                error!("Config failed: {:#}", e);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(code);
}

/// Returns whether any difference was found
fn run_compare(args: CompareArgs, quiet: bool) -> anyhow::Result<bool> {
    let loaded = load_config(false).context("Failed to load configuration")?;
    let mut config = loaded.config;
    apply_overrides(&mut config, &args);

    info!("Comparing:");
    info!("  Left:  {}", args.root1.display());
    info!("  Right: {}", args.root2.display());

    let bar = if quiet || args.json || !std::io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };

    let engine = DiffEngine::new(&config).with_progress(Box::new(ProgressBarSink::new(bar.clone())));
    let outcome = engine.run(&args.root1, &args.root2)?;
    bar.finish_and_clear();

    let categories = categorize(&outcome);

    let mut reports = Vec::new();
    if args.html {
        let mut html = HtmlReport::new(config.report_dir.clone());
        for category in &categories {
            html.emit(&category.entries, &category.base_roots, &category.title)?;
        }
        reports = html.written().to_vec();
    }

    if args.json {
        let report = build_json_report(&outcome, &reports);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&outcome);
        let stdout = std::io::stdout();
        let mut text = TextTreeReport::new(stdout.lock());
        for category in &categories {
            text.emit(&category.entries, &category.base_roots, &category.title)?;
        }
        for path in &reports {
            println!("Report written to {}", path.display());
        }
    }

    Ok(outcome.has_differences())
}

fn run_config(init: bool, portable: bool) -> anyhow::Result<()> {
    let loaded = if init {
        ensure_config(portable)?
    } else {
        load_config(portable)?
    };

    println!("{}", loaded.path.display());
    if !loaded.exists && !init {
        println!("(not created yet, defaults in use; run `foldcmp config --init`)");
    }
    Ok(())
}

/// Command-line flags take precedence over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &CompareArgs) {
    config.ignore_patterns.extend(args.ignore.iter().cloned());
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }
    if args.no_verify {
        config.verify_content = false;
    }
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    if let Some(policy) = args.unreadable_policy {
        config.unreadable_policy = policy.into();
    }
    if let Some(ref dir) = args.report_dir {
        config.report_dir = Some(dir.clone());
    }
}

/// Drives a progress bar from comparison events
struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_event(&self, event: &ComparisonEvent) {
        match event {
            ComparisonEvent::PassStarted { source, .. } => {
                self.bar.set_message(format!("Reading {}", source));
                self.bar.tick();
            }
            ComparisonEvent::PassFinished { .. } => {}
            ComparisonEvent::VerifyStarted { total } => {
                let style = ProgressStyle::with_template(
                    "{spinner} [{bar:40}] {pos}/{len} ({percent}%) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
                self.bar.set_style(style);
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
                self.bar.set_message("Verifying content");
            }
            ComparisonEvent::VerifyProgress { completed, .. } => {
                self.bar.set_position(*completed as u64);
            }
            ComparisonEvent::VerifyFinished { .. } => self.bar.finish_and_clear(),
        }
    }
}

/// A non-empty list of entries to report, with the roots it is relative to
struct Category {
    title: String,
    entries: Vec<RelativePath>,
    base_roots: Vec<PathBuf>,
}

fn categorize(outcome: &ComparisonOutcome) -> Vec<Category> {
    let left = outcome.root(Side::Left).to_path_buf();
    let right = outcome.root(Side::Right).to_path_buf();
    let report = &outcome.report;
    let mut categories = Vec::new();

    for side in [Side::Right, Side::Left] {
        let present_under = outcome.root(side.other()).to_path_buf();
        let missing_under = outcome.root(side).display().to_string();
        categories.push(Category {
            title: format!("Directories missing under {}", missing_under),
            entries: report.missing_subtrees_on(side).to_vec(),
            base_roots: vec![present_under.clone()],
        });
        categories.push(Category {
            title: format!("Files missing under {}", missing_under),
            entries: report.missing_files_on(side).to_vec(),
            base_roots: vec![present_under],
        });
    }

    categories.push(Category {
        title: "File on one side, directory on the other".to_string(),
        entries: report.kind_conflicts.clone(),
        base_roots: vec![left.clone(), right.clone()],
    });

    if let Some(ref mismatches) = outcome.mismatches {
        categories.push(Category {
            title: "Content differs".to_string(),
            entries: mismatches.sorted_paths(),
            base_roots: vec![left, right],
        });
    }

    categories.retain(|category| !category.entries.is_empty());
    categories
}

fn print_summary(outcome: &ComparisonOutcome) {
    let report = &outcome.report;

    println!("\n{}", "=".repeat(80));
    println!("Comparison Results");
    println!("{}", "=".repeat(80));
    for side in [Side::Right, Side::Left] {
        println!(
            "Missing under {}: {} ({} directories, {} files)",
            outcome.root(side).display(),
            report.missing_count(side),
            report.missing_subtrees_on(side).len(),
            report.missing_files_on(side).len()
        );
    }
    println!("Kind conflicts:   {}", report.kind_conflicts.len());
    println!("Common files:     {}", outcome.common_paths.len());
    match outcome.mismatches {
        Some(ref mismatches) => {
            let unreadable = mismatches.iter().filter(|m| m.involves_unreadable()).count();
            println!(
                "Content differs:  {} ({} unreadable)",
                mismatches.len(),
                unreadable
            );
        }
        None => println!("Content differs:  not checked"),
    }
    println!("{}\n", "=".repeat(80));
}

#[derive(Serialize)]
struct JsonReport<'a> {
    left: String,
    right: String,
    summary: JsonSummary,
    #[serde(flatten)]
    report: &'a DiffReport,
    /// Absent when verification was disabled
    mismatches: Option<Vec<&'a Mismatch>>,
    reports: Vec<String>,
}

#[derive(Serialize)]
struct JsonSummary {
    missing_on_left: usize,
    missing_on_right: usize,
    kind_conflicts: usize,
    common_files: usize,
    mismatches: Option<usize>,
    has_differences: bool,
}

fn build_json_report<'a>(outcome: &'a ComparisonOutcome, reports: &[PathBuf]) -> JsonReport<'a> {
    let mismatches = outcome.mismatches.as_ref().map(|set| {
        let mut sorted: Vec<&Mismatch> = set.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        sorted
    });

    JsonReport {
        left: path_string(&outcome.left_root),
        right: path_string(&outcome.right_root),
        summary: JsonSummary {
            missing_on_left: outcome.report.missing_count(Side::Left),
            missing_on_right: outcome.report.missing_count(Side::Right),
            kind_conflicts: outcome.report.kind_conflicts.len(),
            common_files: outcome.common_paths.len(),
            mismatches: outcome.mismatches.as_ref().map(|set| set.len()),
            has_differences: outcome.has_differences(),
        },
        report: &outcome.report,
        mismatches,
        reports: reports.iter().map(|p| path_string(p)).collect(),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
