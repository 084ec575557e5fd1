//! Per-case environment table: read from the case env file or synthesized.
//!
//! Reprocessing jobs run against a family of `*_DATA` directories rooted at
//! the case data home. The APM tooling drops an `env.bash` into the case when
//! it stages one; when that file exists its assignments win, otherwise the
//! standard 12-entry layout is synthesized. Either way the table is built
//! once, is complete, and is never mutated afterward; callers read values out
//! of it instead of the process environment.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::CaseId;
use crate::core::errors::{Result, VatError};

/// Keys every provisioned environment must contain.
pub const REQUIRED_KEYS: [&str; 12] = [
    "DATA_HOME",
    "DATASTREAM_DATA",
    "ARCHIVE_DATA",
    "OUT_DATA",
    "TMP_DATA",
    "HEALTH_DATA",
    "QUICKLOOK_DATA",
    "COLLECTION_DATA",
    "CONF_DATA",
    "LOGS_DATA",
    "WWW_DATA",
    "DB_DATA",
];

/// Literal substituted in env-file values with the resolved data home.
pub const DATA_HOME_PLACEHOLDER: &str = "DATA_HOME";

/// One `KEY=value` assignment, in file (or default-table) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

/// Where the table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvSource {
    CaseFile(PathBuf),
    Defaults,
}

/// Immutable per-case environment table.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    data_home: PathBuf,
    source: EnvSource,
    entries: Vec<EnvEntry>,
}

impl Environment {
    /// Build the table for one case.
    ///
    /// The data home is `<reproc_root>/<case_id>`. A present env file is
    /// parsed line by line (split on the first `=`, one surrounding quote
    /// pair stripped, `DATA_HOME` placeholder substituted) and must cover
    /// every required key; an absent one falls back to the default table.
    pub fn provision(reproc_root: &Path, case_id: &CaseId, env_file_name: &str) -> Result<Self> {
        let data_home = reproc_root.join(case_id.as_str());
        let env_file = data_home.join(env_file_name);

        if env_file.is_file() {
            let entries = parse_env_file(&env_file, &data_home)?;
            ensure_complete(&entries, &env_file)?;
            Ok(Self {
                data_home,
                source: EnvSource::CaseFile(env_file),
                entries,
            })
        } else {
            let entries = default_table(&data_home);
            Ok(Self {
                data_home,
                source: EnvSource::Defaults,
                entries,
            })
        }
    }

    /// Resolved `<reproc_root>/<case_id>` used for placeholder substitution.
    #[must_use]
    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    #[must_use]
    pub fn source(&self) -> &EnvSource {
        &self.source
    }

    #[must_use]
    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    /// Look up one key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}

fn default_table(data_home: &Path) -> Vec<EnvEntry> {
    let sub = |name: &str| data_home.join(name).to_string_lossy().into_owned();
    let pairs = [
        ("DATA_HOME", data_home.to_string_lossy().into_owned()),
        ("DATASTREAM_DATA", sub("datastream")),
        ("ARCHIVE_DATA", sub("archive")),
        ("OUT_DATA", sub("out")),
        ("TMP_DATA", sub("tmp")),
        ("HEALTH_DATA", sub("health")),
        ("QUICKLOOK_DATA", sub("quicklooks")),
        ("COLLECTION_DATA", sub("collection")),
        ("CONF_DATA", sub("conf")),
        ("LOGS_DATA", sub("logs")),
        ("WWW_DATA", sub("www")),
        ("DB_DATA", sub("db")),
    ];
    pairs
        .into_iter()
        .map(|(key, value)| EnvEntry {
            key: key.to_string(),
            value,
        })
        .collect()
}

fn parse_env_file(path: &Path, data_home: &Path) -> Result<Vec<EnvEntry>> {
    let raw = fs::read_to_string(path).map_err(|source| VatError::EnvironmentUnreadable {
        path: path.to_path_buf(),
        details: source.to_string(),
    })?;
    let data_home_str = data_home.to_string_lossy();

    let mut entries = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(VatError::EnvironmentUnreadable {
                path: path.to_path_buf(),
                details: format!("line {}: no '=' in {line:?}", idx + 1),
            });
        };
        let value = strip_quotes(value.trim()).replace(DATA_HOME_PLACEHOLDER, &data_home_str);
        entries.push(EnvEntry {
            key: key.trim().to_string(),
            value,
        });
    }
    Ok(entries)
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn ensure_complete(entries: &[EnvEntry], path: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .filter(|key| !entries.iter().any(|entry| entry.key == **key))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(VatError::EnvironmentUnreadable {
            path: path.to_path_buf(),
            details: format!("missing required keys: {}", missing.join(", ")),
        })
    }
}
