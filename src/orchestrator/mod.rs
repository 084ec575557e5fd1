//! Run orchestration: the full regression sequence for one case.
//!
//! Stage order is the safety story. The ingest command is recovered from the
//! archive before anything on disk changes, so a miss aborts the run with
//! the inputs untouched; the backup lands before the mutation rewrites
//! anything; stale review artifacts are cleared before the re-run can drop
//! new ones. The recovered command is reported, never executed.

#![allow(missing_docs)]

use std::path::PathBuf;

use serde::Serialize;

use crate::archive::{ArchiveAccess, IngestInvocation, locate_ingest_command};
use crate::cleanup::{CleanupReport, clean_stale_artifacts};
use crate::context::confirm::ContextPrompt;
use crate::context::{TestContext, infer_from_path};
use crate::core::config::Config;
use crate::core::errors::{Result, VatError};
use crate::environment::{EnvSource, Environment};
use crate::inputs::backup::{BackupReport, backup_inputs};
use crate::inputs::{InputSet, discover_inputs};
use crate::logger::{EventType, LogEntry, RunLog, Severity};
use crate::mutate::{MutationReport, MutationSpec, mutate_file};

/// Inputs to one regression run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the run was started from; context and inputs come from it.
    pub work_dir: PathBuf,
    pub mutation: MutationSpec,
}

/// Everything a completed run did, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub context: TestContext,
    pub environment: Environment,
    pub inputs: InputSet,
    pub date_token: String,
    pub invocation: IngestInvocation,
    pub backup: BackupReport,
    pub cleanup: CleanupReport,
    pub mutations: Vec<MutationReport>,
}

/// Run the whole sequence for the case inferred from `options.work_dir`.
///
/// On failure the error is also recorded on the activity log before it
/// propagates.
pub fn run_pipeline(
    config: &Config,
    options: &RunOptions,
    archive: &dyn ArchiveAccess,
    prompt: &mut dyn ContextPrompt,
    log: &mut RunLog,
) -> Result<RunReport> {
    match run_stages(config, options, archive, prompt, log) {
        Ok(report) => {
            let mut entry = LogEntry::new(EventType::RunCompleted, Severity::Info);
            entry.case_id = Some(report.context.case_id.to_string());
            entry.count = Some(report.mutations.len() as u64);
            entry.command = Some(report.invocation.command.clone());
            log.record(entry);
            log.flush();
            Ok(report)
        }
        Err(err) => {
            let mut entry = LogEntry::new(EventType::Error, Severity::Critical);
            entry.error_code = Some(err.code().to_string());
            entry.details = Some(err.to_string());
            log.record(entry);
            log.flush();
            Err(err)
        }
    }
}

fn run_stages(
    config: &Config,
    options: &RunOptions,
    archive: &dyn ArchiveAccess,
    prompt: &mut dyn ContextPrompt,
    log: &mut RunLog,
) -> Result<RunReport> {
    let mut entry = LogEntry::new(EventType::RunStarted, Severity::Info);
    entry.path = Some(options.work_dir.display().to_string());
    log.record(entry);

    // ──────────────────── context ────────────────────
    let inference = infer_from_path(&options.work_dir)?;
    let context = prompt.resolve(inference)?;
    let mut entry = LogEntry::new(EventType::ContextResolved, Severity::Info);
    entry.case_id = Some(context.case_id.to_string());
    entry.datastream = Some(context.datastream.to_string());
    log.stage(
        entry,
        &format!(
            "Testing {} for case {}",
            context.datastream, context.case_id
        ),
    );

    // ──────────────────── environment ────────────────────
    let environment = Environment::provision(
        &config.reproc.root,
        &context.case_id,
        &config.reproc.env_file_name,
    )?;
    for env_entry in environment.entries() {
        log.echo(&format!("{}={}", env_entry.key, env_entry.value));
    }
    let source_line = match environment.source() {
        EnvSource::CaseFile(path) => format!("from {}", path.display()),
        EnvSource::Defaults => "from built-in defaults".to_string(),
    };
    let mut entry = LogEntry::new(EventType::EnvironmentProvisioned, Severity::Info);
    entry.path = Some(environment.data_home().display().to_string());
    entry.count = Some(environment.entries().len() as u64);
    entry.details = Some(source_line.clone());
    log.stage(
        entry,
        &format!(
            "Provisioned {} environment entries {source_line}",
            environment.entries().len()
        ),
    );

    // ──────────────────── inputs ────────────────────
    let inputs = discover_inputs(&options.work_dir)?;
    let Some(date_token) = inputs.date_token.clone() else {
        return Err(VatError::DateTokenMissing {
            dir: options.work_dir.clone(),
        });
    };
    let mut entry = LogEntry::new(EventType::InputsDiscovered, Severity::Info);
    entry.path = Some(inputs.work_dir.display().to_string());
    entry.count = Some(inputs.records.len() as u64);
    entry.details = Some(date_token.clone());
    log.stage(
        entry,
        &format!(
            "Found {} input files dated {date_token}",
            inputs.records.len()
        ),
    );

    // ──────────────────── ingest command ────────────────────
    // Recovered before any disk change so a miss leaves the case pristine.
    let invocation = locate_ingest_command(
        archive,
        &context,
        &date_token,
        &config.archive.raw_level_suffix,
    )?;
    let mut entry = LogEntry::new(EventType::CommandRecovered, Severity::Info);
    entry.command = Some(invocation.command.clone());
    entry.path = Some(invocation.source.display().to_string());
    log.stage(
        entry,
        &format!(
            "Recovered ingest command from {}",
            invocation.source.display()
        ),
    );

    // ──────────────────── backup ────────────────────
    let backup = backup_inputs(
        &inputs.records,
        &options.work_dir,
        &config.reproc.backup_dir_name,
    )?;
    let mut entry = LogEntry::new(EventType::BackupCompleted, Severity::Info);
    entry.path = Some(backup.backup_dir.display().to_string());
    entry.count = Some(backup.copied.len() as u64);
    if backup.stopped_early {
        entry.details = Some("stopped at a file already inside the backup".to_string());
    }
    log.stage(
        entry,
        &format!(
            "Backed up {} files to {}",
            backup.copied.len(),
            backup.backup_dir.display()
        ),
    );

    // ──────────────────── stale artifacts ────────────────────
    let cleanup = clean_stale_artifacts(
        &config.reproc.post_processing_root,
        &context.case_id,
        &config.reproc.review_artifact_prefix,
    );
    let severity = if cleanup.failures > 0 {
        Severity::Warning
    } else {
        Severity::Info
    };
    let mut entry = LogEntry::new(EventType::ArtifactsRemoved, severity);
    entry.path = Some(cleanup.target_dir.display().to_string());
    entry.count = Some(cleanup.removed.len() as u64);
    if cleanup.failures > 0 {
        entry.details = Some(format!("{} removals failed", cleanup.failures));
    }
    log.stage(
        entry,
        &format!(
            "Removed {} stale {}* artifacts",
            cleanup.removed.len(),
            config.reproc.review_artifact_prefix
        ),
    );

    // ──────────────────── mutation ────────────────────
    let mut mutations = Vec::with_capacity(inputs.records.len());
    for record in &inputs.records {
        let report = mutate_file(&record.path, &options.mutation)?;
        let mut entry = LogEntry::new(EventType::FileMutated, Severity::Info);
        entry.path = Some(report.path.display().to_string());
        entry.count = Some(report.rows_mutated as u64);
        log.record(entry);
        mutations.push(report);
    }
    log.echo(&format!(
        "Offset column {} by {} in {} files",
        options.mutation.column,
        options.mutation.offset,
        mutations.len()
    ));

    Ok(RunReport {
        context,
        environment,
        inputs,
        date_token,
        invocation,
        backup,
        cleanup,
        mutations,
    })
}
