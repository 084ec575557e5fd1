//! VAT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, VatError>;

/// Top-level error type for the variable-mapping autotest tool.
#[derive(Debug, Error)]
pub enum VatError {
    #[error("[VAT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[VAT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[VAT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[VAT-2001] test context unresolved from {path}: {details}")]
    ContextUnresolved { path: PathBuf, details: String },

    #[error("[VAT-2002] test context rejected: {details}")]
    ContextRejected { details: String },

    #[error("[VAT-2101] environment file unusable at {path}: {details}")]
    EnvironmentUnreadable { path: PathBuf, details: String },

    #[error("[VAT-2201] no input files found under {dir}")]
    NoInputFiles { dir: PathBuf },

    #[error("[VAT-2202] no date token in any input file name under {dir}")]
    DateTokenMissing { dir: PathBuf },

    #[error("[VAT-2301] ingest command not recoverable for site {site}: {details} (searched {pattern})")]
    CommandNotRecovered {
        site: String,
        pattern: String,
        details: String,
    },

    #[error("[VAT-2401] non-numeric cell at {path} row {row} column {column}: {value:?}")]
    NonNumericCell {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("[VAT-2402] column {column} out of range at {path} row {row} (row has {width} cells)")]
    ColumnOutOfRange {
        path: PathBuf,
        row: usize,
        column: usize,
        width: usize,
    },

    #[error("[VAT-2501] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[VAT-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VatError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "VAT-1001",
            Self::MissingConfig { .. } => "VAT-1002",
            Self::ConfigParse { .. } => "VAT-1003",
            Self::ContextUnresolved { .. } => "VAT-2001",
            Self::ContextRejected { .. } => "VAT-2002",
            Self::EnvironmentUnreadable { .. } => "VAT-2101",
            Self::NoInputFiles { .. } => "VAT-2201",
            Self::DateTokenMissing { .. } => "VAT-2202",
            Self::CommandNotRecovered { .. } => "VAT-2301",
            Self::NonNumericCell { .. } => "VAT-2401",
            Self::ColumnOutOfRange { .. } => "VAT-2402",
            Self::Serialization { .. } => "VAT-2501",
            Self::Io { .. } => "VAT-3002",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Every domain failure here is deterministic for a fixed tree; only raw
    /// IO can be transient (NFS hiccups on the archive mount).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for VatError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for VatError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
