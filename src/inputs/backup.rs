//! Pristine-input staging: copy the discovered files into a hidden directory.
//!
//! The copies let the test be re-run after the mutator has rewritten the live
//! inputs. Copying is idempotent; an existing backup is simply rewritten with
//! the same bytes. If a source ever resolves to its own destination the whole
//! loop stops there rather than skipping the entry, which matches how this
//! tool has always behaved when pointed at its own backup directory.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{Result, VatError};
use crate::inputs::FileRecord;

/// What the backup pass did.
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub backup_dir: PathBuf,
    pub copied: Vec<PathBuf>,
    pub stopped_early: bool,
}

/// Copy every record into `<work_dir>/<backup_dir_name>/`, creating it first.
pub fn backup_inputs(
    records: &[FileRecord],
    work_dir: &Path,
    backup_dir_name: &str,
) -> Result<BackupReport> {
    let backup_dir = work_dir.join(backup_dir_name);
    fs::create_dir_all(&backup_dir).map_err(|e| VatError::io(&backup_dir, e))?;

    let mut copied = Vec::new();
    let mut stopped_early = false;
    for record in records {
        let Some(name) = record.path.file_name() else {
            continue;
        };
        let destination = backup_dir.join(name);
        if resolves_to_same_file(&record.path, &destination) {
            stopped_early = true;
            break;
        }
        fs::copy(&record.path, &destination).map_err(|e| VatError::io(&record.path, e))?;
        copied.push(destination);
    }

    Ok(BackupReport {
        backup_dir,
        copied,
        stopped_early,
    })
}

fn resolves_to_same_file(src: &Path, dst: &Path) -> bool {
    // The destination rarely exists yet; canonicalize failing means "not
    // the same file".
    match (fs::canonicalize(src), fs::canonicalize(dst)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
