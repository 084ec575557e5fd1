//! Stale review-artifact cleanup.
//!
//! A prior run of the reviewer drops `ncr*` files under the case's
//! post-processing directory; left in place they would be picked up as
//! results of the new run. Cleanup is best-effort: a missing directory means
//! nothing to do, and a file that cannot be removed is counted and skipped
//! rather than aborting the run.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::CaseId;

/// What a cleanup pass removed (or failed to).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub target_dir: PathBuf,
    pub removed: Vec<PathBuf>,
    pub failures: usize,
}

impl CleanupReport {
    fn empty(target_dir: PathBuf) -> Self {
        Self {
            target_dir,
            removed: Vec::new(),
            failures: 0,
        }
    }
}

/// List `<prefix>*` files directly under `<post_processing_root>/<case_id>`,
/// sorted by name.
///
/// Only plain files are reported; subdirectories and unreadable entries are
/// skipped. A missing case directory yields an empty list.
#[must_use]
pub fn stale_artifacts(post_processing_root: &Path, case_id: &CaseId, prefix: &str) -> Vec<PathBuf> {
    let target_dir = post_processing_root.join(case_id.as_str());
    let Ok(entries) = fs::read_dir(&target_dir) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            candidates.push(entry.path());
        }
    }
    candidates.sort_unstable();
    candidates
}

/// Remove `<prefix>*` files directly under `<post_processing_root>/<case_id>`.
///
/// Only plain files are touched; subdirectories and anything not carrying
/// the prefix stay as they are.
#[must_use]
pub fn clean_stale_artifacts(
    post_processing_root: &Path,
    case_id: &CaseId,
    prefix: &str,
) -> CleanupReport {
    let target_dir = post_processing_root.join(case_id.as_str());
    let mut report = CleanupReport::empty(target_dir);

    for path in stale_artifacts(post_processing_root, case_id, prefix) {
        match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(_) => report.failures += 1,
        }
    }
    report
}
