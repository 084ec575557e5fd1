//! Production archive access and ingest-command recovery.
//!
//! The archive lays processed output under `<root>/<site>/<datastream>/`,
//! one directory per processing level (`sgp30ebbrC1.00`, `sgp30ebbrC1.b1`,
//! ...). Raw-level directories never carry a `command` attribute, so the
//! locator walks the non-raw candidates in sorted order, finds the file for
//! the run's date token, and reads the command out of its header. The first
//! hit ends the search.
//!
//! Archive access is a trait so the locator can be exercised against
//! in-memory trees; the production implementation walks the filesystem
//! directly instead of shelling out to directory listings and header dumps.

#![allow(missing_docs)]

pub mod metadata;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::TestContext;
use crate::core::config::ArchiveConfig;
use crate::core::errors::{Result, VatError};

/// Read-side view of the production archive.
pub trait ArchiveAccess {
    /// Sorted processing directories under `<site>/` whose names start with
    /// the datastream prefix. A missing site tree is an empty list.
    fn list_processing_directories(&self, site: &str, datastream_prefix: &str)
    -> Result<Vec<PathBuf>>;

    /// First file (sorted by name) under `dir` whose name contains the token.
    fn find_dated_file(&self, dir: &Path, date_token: &str) -> Result<Option<PathBuf>>;

    /// Command attribute from the file's metadata header, if present.
    fn read_command_metadata(&self, path: &Path) -> Result<Option<String>>;
}

/// The production ingest invocation, recovered once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestInvocation {
    pub command: String,
    /// Processed file the command was read from, kept for diagnostics.
    pub source: PathBuf,
}

/// Filesystem-backed archive.
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: PathBuf,
    header_scan_bytes: usize,
}

impl FsArchive {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, header_scan_bytes: usize) -> Self {
        Self {
            root: root.into(),
            header_scan_bytes,
        }
    }

    #[must_use]
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.root.clone(), config.header_scan_bytes)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArchiveAccess for FsArchive {
    fn list_processing_directories(
        &self,
        site: &str,
        datastream_prefix: &str,
    ) -> Result<Vec<PathBuf>> {
        let site_dir = self.root.join(site);
        if !site_dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&site_dir).map_err(|e| VatError::io(&site_dir, e))?;

        let mut dirs = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|e| VatError::io(&site_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(datastream_prefix) {
                continue;
            }
            let file_type = entry.file_type().map_err(|e| VatError::io(entry.path(), e))?;
            if file_type.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort_unstable();
        Ok(dirs)
    }

    fn find_dated_file(&self, dir: &Path, date_token: &str) -> Result<Option<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| VatError::io(dir, e))?;

        let mut matches = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|e| VatError::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.contains(date_token) {
                continue;
            }
            let file_type = entry.file_type().map_err(|e| VatError::io(entry.path(), e))?;
            if file_type.is_file() {
                matches.push(entry.path());
            }
        }
        matches.sort_unstable();
        Ok(matches.into_iter().next())
    }

    fn read_command_metadata(&self, path: &Path) -> Result<Option<String>> {
        let file = fs::File::open(path).map_err(|e| VatError::io(path, e))?;
        let mut header = Vec::with_capacity(self.header_scan_bytes.min(8 * 1024));
        file.take(self.header_scan_bytes as u64)
            .read_to_end(&mut header)
            .map_err(|e| VatError::io(path, e))?;
        Ok(metadata::extract_command_attribute(&header))
    }
}

/// Walk the archive for the context's datastream and recover the command.
///
/// Directories whose names end with the raw level suffix are skipped; raw
/// data was never produced by an ingest, so its metadata cannot name one.
pub fn locate_ingest_command(
    archive: &dyn ArchiveAccess,
    ctx: &TestContext,
    date_token: &str,
    raw_level_suffix: &str,
) -> Result<IngestInvocation> {
    let site = ctx.site();
    let prefix = ctx.datastream.archive_prefix();
    let pattern = format!("{site}/{prefix}*");

    let dirs = archive.list_processing_directories(site, prefix)?;
    if dirs.is_empty() {
        return Err(VatError::CommandNotRecovered {
            site: site.to_string(),
            pattern,
            details: "no processing directories match the datastream prefix".to_string(),
        });
    }

    for dir in &dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.ends_with(raw_level_suffix) {
            continue;
        }
        let Some(file) = archive.find_dated_file(dir, date_token)? else {
            continue;
        };
        if let Some(command) = archive.read_command_metadata(&file)? {
            return Ok(IngestInvocation {
                command,
                source: file,
            });
        }
    }

    Err(VatError::CommandNotRecovered {
        site: site.to_string(),
        pattern,
        details: format!("no processed file dated {date_token} carried a command attribute"),
    })
}
