//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use varmap_autotest::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, VatError};

// Context
pub use crate::context::confirm::{AutoAccept, ConsolePrompt, ContextPrompt};
pub use crate::context::{CaseId, DatastreamId, PathInference, TestContext, infer_from_path};

// Environment
pub use crate::environment::{EnvSource, Environment};

// Inputs
pub use crate::inputs::backup::{BackupReport, backup_inputs};
pub use crate::inputs::{FileRecord, InputSet, discover_inputs};

// Archive
pub use crate::archive::{ArchiveAccess, FsArchive, IngestInvocation, locate_ingest_command};

// Mutation
pub use crate::mutate::{MutationReport, MutationSpec, mutate_file};

// Cleanup
pub use crate::cleanup::{CleanupReport, clean_stale_artifacts, stale_artifacts};

// Orchestration
pub use crate::orchestrator::{RunOptions, RunReport, run_pipeline};

// Logging
pub use crate::logger::RunLog;
