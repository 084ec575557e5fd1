//! Raw input discovery: list the case working directory, find the date token.
//!
//! All raw files for one run are expected to share one 8-digit observation
//! date in their names. The scan walks the sorted listing and takes the first
//! token it sees, then stops looking; files after the hit keep an empty token
//! even when their names would match.

#![allow(missing_docs)]

pub mod backup;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::ContextPatterns;
use crate::core::errors::{Result, VatError};

/// One discovered raw input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// 8-digit date found in the file name, only filled for the first hit.
    pub date_token: Option<String>,
}

/// The discovered inputs plus the canonical date token shared by the run.
#[derive(Debug, Clone, Serialize)]
pub struct InputSet {
    pub work_dir: PathBuf,
    pub records: Vec<FileRecord>,
    pub date_token: Option<String>,
}

/// List regular files directly under `work_dir` and extract the date token.
///
/// Hidden (dot-prefixed) names are skipped so the backup directory from a
/// prior run never counts as input. The listing is sorted by file name; an
/// empty listing is an error.
pub fn discover_inputs(work_dir: &Path) -> Result<InputSet> {
    let entries = fs::read_dir(work_dir).map_err(|e| VatError::io(work_dir, e))?;

    let mut names: Vec<String> = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| VatError::io(work_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| VatError::io(entry.path(), e))?;
        if file_type.is_file() {
            names.push(name);
        }
    }
    names.sort_unstable();

    if names.is_empty() {
        return Err(VatError::NoInputFiles {
            dir: work_dir.to_path_buf(),
        });
    }

    let patterns = ContextPatterns::new()?;
    let mut records: Vec<FileRecord> = names
        .into_iter()
        .map(|name| FileRecord {
            path: work_dir.join(name),
            date_token: None,
        })
        .collect();

    // First name with a token decides; the rest are assumed to agree.
    let mut date_token = None;
    for record in &mut records {
        let name = record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(token) = patterns.find_date_token(&name) {
            record.date_token = Some(token.clone());
            date_token = Some(token);
            break;
        }
    }

    Ok(InputSet {
        work_dir: work_dir.to_path_buf(),
        records,
        date_token,
    })
}
