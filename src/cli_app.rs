//! Command-line surface: argument parsing, dispatch, and output rendering.
//!
//! Every subcommand renders either a human summary or a single JSON line,
//! chosen by `--json`, the `VAT_OUTPUT_FORMAT` variable, or terminal
//! detection. Exit codes follow one contract: 1 usage, 2 runtime,
//! 3 serialization, 4 partial success.
#![allow(missing_docs)]

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use varmap_autotest::archive::FsArchive;
use varmap_autotest::cleanup::{clean_stale_artifacts, stale_artifacts};
use varmap_autotest::context::confirm::{AutoAccept, ConsolePrompt, ContextPrompt};
use varmap_autotest::context::{TestContext, infer_from_path};
use varmap_autotest::core::config::Config;
use varmap_autotest::core::errors::VatError;
use varmap_autotest::environment::{EnvSource, Environment};
use varmap_autotest::logger::{EventType, LogEntry, RunLog, Severity};
use varmap_autotest::mutate::MutationSpec;
use varmap_autotest::orchestrator::{RunOptions, RunReport, run_pipeline};

const OUTPUT_FORMAT_ENV: &str = "VAT_OUTPUT_FORMAT";

/// Printed when the modified column is also skipped, so the run is pointless.
const SKIP_MESSAGE: &str = "Skipping modification column, no effect.";

#[derive(Debug, Parser)]
#[command(
    name = "vat",
    version,
    about = "Regression autotest for reprocessing ingests",
    long_about = "Prepares a reprocessing case for a regression run: infers the case and \
                  datastream from the working directory, provisions the per-case environment, \
                  backs up the raw inputs, offsets one column in every input file, clears stale \
                  review artifacts, and reports the archived ingest command to re-run. The \
                  command is never executed.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file to use instead of the default.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Print per-file detail in summaries.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress narration; errors and the recovered command only.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory to treat as the case working directory.
    #[arg(long, global = true, value_name = "DIR")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prepare the case in the working directory and report the ingest command
    Run(RunArgs),
    /// Show the case and datastream inferred from the working directory
    Context,
    /// Show the environment table a run would provision
    Env,
    /// Remove stale review artifacts for the case
    Clean(CleanArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Debug, Args, Serialize)]
struct RunArgs {
    /// Zero-based column to offset in every input file.
    #[arg(short = 'm', long = "modify", value_name = "COLUMN")]
    modify: usize,

    /// Field delimiter of the input files.
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    delimiter: char,

    /// Leading rows to copy through untouched.
    #[arg(long, value_name = "ROWS", default_value_t = 0)]
    header: usize,

    /// Column to leave untouched; naming the modified column skips the run.
    #[arg(long = "skip-col", value_name = "COLUMN")]
    skip_col: Vec<usize>,

    /// Always confirm the inferred context at a prompt.
    #[arg(short = 'I', long, conflicts_with = "yes")]
    interactive: bool,

    /// Accept the inferred context without prompting.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Args, Serialize)]
struct CleanArgs {
    /// List what would be removed without removing it.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct CompletionsArgs {
    /// Shell to generate a completion script for.
    #[arg(value_enum)]
    shell: Shell,
}

// ──────────────────── errors and exit codes ────────────────────

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad invocation or a rejected context.
    #[error("{0}")]
    User(String),

    /// The pipeline stopped before finishing.
    #[error("{0}")]
    Runtime(String),

    /// Some of the requested work happened, some failed.
    #[error("{0}")]
    Partial(String),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

/// Context problems are the operator's to fix (wrong directory, declined
/// confirmation); everything else is a runtime failure.
fn lift(err: VatError) -> CliError {
    match &err {
        VatError::ContextUnresolved { .. } | VatError::ContextRejected { .. } => {
            CliError::User(err.to_string())
        }
        _ => CliError::Runtime(err.to_string()),
    }
}

// ──────────────────── dispatch ────────────────────

pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_case(cli, args),
        Command::Context => show_context(cli),
        Command::Env => show_environment(cli),
        Command::Clean(args) => clean_case(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_case(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;

    let mut mutation = MutationSpec::from_config(&config.mutation, args.modify);
    mutation.delimiter = args.delimiter;
    mutation.header_rows = args.header;
    mutation.skip_columns = args.skip_col.iter().copied().collect();

    // Guarded before any disk access: with its column skipped, the run could
    // not change a single cell.
    if mutation.is_noop() {
        return skip_run(cli, args, &config);
    }

    let work_dir = resolve_work_dir(cli)?;
    let mode = output_mode(cli);
    let echo = mode == OutputMode::Human && !cli.quiet;
    let mut log = RunLog::new(echo, Some(config.paths.jsonl_log.as_path()));
    let mut prompt = pick_prompt(args);
    let archive = FsArchive::from_config(&config.archive);
    let options = RunOptions { work_dir, mutation };

    let report =
        run_pipeline(&config, &options, &archive, prompt.as_mut(), &mut log).map_err(lift)?;

    match mode {
        OutputMode::Human => print_run_summary(&report, cli),
        OutputMode::Json => {
            let output = json!({
                "command": "run",
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&output)?;
        }
    }
    Ok(())
}

/// The skip is an announced outcome, not an error: exit 0, one line of
/// output, one activity-log entry.
fn skip_run(cli: &Cli, args: &RunArgs, config: &Config) -> Result<(), CliError> {
    let mut log = RunLog::new(false, Some(config.paths.jsonl_log.as_path()));
    let mut entry = LogEntry::new(EventType::RunSkipped, Severity::Info);
    entry.details = Some(format!("column {} is excluded by --skip-col", args.modify));
    log.record(entry);
    log.flush();

    match output_mode(cli) {
        OutputMode::Human => println!("{SKIP_MESSAGE}"),
        OutputMode::Json => {
            let output = json!({
                "command": "run",
                "status": "skipped",
                "message": SKIP_MESSAGE,
                "args": serde_json::to_value(args)?,
            });
            write_json_line(&output)?;
        }
    }
    Ok(())
}

/// `--yes` forces auto-accept and `-I` forces the console prompt; otherwise
/// the choice follows whether stdin is a terminal.
fn pick_prompt(args: &RunArgs) -> Box<dyn ContextPrompt> {
    if args.yes {
        Box::new(AutoAccept)
    } else if args.interactive || io::stdin().is_terminal() {
        Box::new(ConsolePrompt::stdio())
    } else {
        Box::new(AutoAccept)
    }
}

/// The recovered command is always the last stdout line, so `tail -n 1`
/// hands it straight to a shell.
fn print_run_summary(report: &RunReport, cli: &Cli) {
    if !cli.quiet {
        let rows: usize = report.mutations.iter().map(|m| m.rows_mutated).sum();
        println!();
        println!("{}", "Run summary".bold());
        println!("  Case:        {}", report.context.case_id);
        println!("  Datastream:  {}", report.context.datastream);
        println!("  Date token:  {}", report.date_token);
        println!(
            "  Backup:      {} files in {}",
            report.backup.copied.len(),
            report.backup.backup_dir.display()
        );
        println!(
            "  Mutated:     {} files ({rows} rows)",
            report.mutations.len()
        );
        println!(
            "  Cleanup:     {} stale artifacts removed",
            report.cleanup.removed.len()
        );
        println!("  Source:      {}", report.invocation.source.display());
        if cli.verbose {
            for mutation in &report.mutations {
                println!(
                    "    {} ({} of {} rows)",
                    mutation.path.display(),
                    mutation.rows_mutated,
                    mutation.rows_total
                );
            }
            for removed in &report.cleanup.removed {
                println!("    removed {}", removed.display());
            }
        }
        println!();
        println!("Re-run the ingest with:");
    }
    println!("{}", report.invocation.command);
}

fn show_context(cli: &Cli) -> Result<(), CliError> {
    let work_dir = resolve_work_dir(cli)?;
    let inference = infer_from_path(&work_dir).map_err(lift)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Working directory: {}", inference.path.display());
            match &inference.case_id {
                Some(case_id) => println!("Case ID:           {case_id}"),
                None => println!("Case ID:           (not found)"),
            }
            match &inference.datastream {
                Some(datastream) => println!("Datastream:        {datastream}"),
                None => println!("Datastream:        (not found)"),
            }
            if inference.complete().is_none() {
                println!("{}", inference.describe_gaps().yellow());
            }
        }
        OutputMode::Json => {
            let output = json!({
                "command": "context",
                "inference": serde_json::to_value(&inference)?,
                "complete": inference.complete().is_some(),
            });
            write_json_line(&output)?;
        }
    }
    Ok(())
}

fn show_environment(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let context = resolve_context(cli)?;
    let environment = Environment::provision(
        &config.reproc.root,
        &context.case_id,
        &config.reproc.env_file_name,
    )
    .map_err(lift)?;

    match output_mode(cli) {
        OutputMode::Human => {
            let source = match environment.source() {
                EnvSource::CaseFile(path) => format!("from {}", path.display()),
                EnvSource::Defaults => "from built-in defaults".to_string(),
            };
            println!("Environment for {} ({source}):", context.case_id);
            for entry in environment.entries() {
                println!("{}={}", entry.key, entry.value);
            }
        }
        OutputMode::Json => {
            let output = json!({
                "command": "env",
                "case_id": context.case_id.as_str(),
                "environment": serde_json::to_value(&environment)?,
            });
            write_json_line(&output)?;
        }
    }
    Ok(())
}

fn clean_case(cli: &Cli, args: &CleanArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let context = resolve_context(cli)?;
    let prefix = config.reproc.review_artifact_prefix.as_str();

    if args.dry_run {
        let candidates = stale_artifacts(
            &config.reproc.post_processing_root,
            &context.case_id,
            prefix,
        );
        match output_mode(cli) {
            OutputMode::Human => {
                println!("Would remove {} {prefix}* artifacts:", candidates.len());
                for path in &candidates {
                    println!("  {}", path.display());
                }
            }
            OutputMode::Json => {
                let output = json!({
                    "command": "clean",
                    "dry_run": true,
                    "candidates": candidates,
                });
                write_json_line(&output)?;
            }
        }
        return Ok(());
    }

    let report = clean_stale_artifacts(
        &config.reproc.post_processing_root,
        &context.case_id,
        prefix,
    );

    let mut log = RunLog::new(false, Some(config.paths.jsonl_log.as_path()));
    let severity = if report.failures > 0 {
        Severity::Warning
    } else {
        Severity::Info
    };
    let mut entry = LogEntry::new(EventType::ArtifactsRemoved, severity);
    entry.case_id = Some(context.case_id.to_string());
    entry.path = Some(report.target_dir.display().to_string());
    entry.count = Some(report.removed.len() as u64);
    log.record(entry);
    log.flush();

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "Removed {} {prefix}* artifacts from {}",
                report.removed.len(),
                report.target_dir.display()
            );
            if cli.verbose {
                for path in &report.removed {
                    println!("  {}", path.display());
                }
            }
        }
        OutputMode::Json => {
            let output = json!({
                "command": "clean",
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&output)?;
        }
    }

    if report.failures > 0 {
        return Err(CliError::Partial(format!(
            "{} of {} removals failed",
            report.failures,
            report.failures + report.removed.len()
        )));
    }
    Ok(())
}

// ──────────────────── shared helpers ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))
}

fn resolve_work_dir(cli: &Cli) -> Result<PathBuf, CliError> {
    match &cli.cwd {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Runtime(format!("cannot determine the working directory: {e}"))),
    }
}

/// Resolve a complete context from the working directory, never prompting.
/// Informational commands should not block on a terminal.
fn resolve_context(cli: &Cli) -> Result<TestContext, CliError> {
    let work_dir = resolve_work_dir(cli)?;
    let inference = infer_from_path(&work_dir).map_err(lift)?;
    AutoAccept.resolve(inference).map_err(lift)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var(OUTPUT_FORMAT_ENV).ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

/// The `--json` flag wins, then the env var, then terminal detection
/// (`auto` and unrecognized values fall through to the terminal check).
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => {
            if stdout_is_tty {
                OutputMode::Human
            } else {
                OutputMode::Json
            }
        }
    }
}

fn write_json_line(value: &Value) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}
