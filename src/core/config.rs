//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, VatError};

/// Full configuration model for the autotest tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub reproc: ReprocConfig,
    pub archive: ArchiveConfig,
    pub mutation: MutationConfig,
    pub paths: PathsConfig,
}

/// Reprocessing tree layout: where cases live and what they contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReprocConfig {
    /// Root holding one directory per case (`REPROC_HOME`).
    pub root: PathBuf,
    /// Root holding per-case post-processing output (`POST_PROC`).
    pub post_processing_root: PathBuf,
    /// Per-case environment file name, looked up under the case data home.
    pub env_file_name: String,
    /// Hidden directory created next to the raw inputs for backups.
    pub backup_dir_name: String,
    /// File-name prefix of stale review artifacts removed before a run.
    pub review_artifact_prefix: String,
}

/// Production archive layout and metadata-scan limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archive root; processed output lives under `<root>/<site>/`.
    pub root: PathBuf,
    /// Processing-level suffix marking raw directories, which are skipped.
    pub raw_level_suffix: String,
    /// Upper bound on how much of a processed file is scanned for its header.
    pub header_scan_bytes: usize,
}

/// Column mutation defaults; the CLI can override all of them per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MutationConfig {
    /// Offset added to every value in the mutated column.
    pub offset: i64,
    /// Cell delimiter of the raw input rows.
    pub delimiter: char,
    /// Leading rows copied through untouched.
    pub header_rows: usize,
}

/// Filesystem paths used by the tool itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for ReprocConfig {
    fn default() -> Self {
        let root = env::var_os("REPROC_HOME").map_or_else(
            || {
                eprintln!(
                    "[VAT-CONFIG] WARNING: REPROC_HOME not set, falling back to /reproc for the case root"
                );
                PathBuf::from("/reproc")
            },
            PathBuf::from,
        );
        let post_processing_root = env::var_os("POST_PROC")
            .map_or_else(|| root.join("post_processing"), PathBuf::from);
        Self {
            root,
            post_processing_root,
            env_file_name: "env.bash".to_string(),
            backup_dir_name: ".autotest".to_string(),
            review_artifact_prefix: "ncr".to_string(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/data/archive"),
            raw_level_suffix: "00".to_string(),
            header_scan_bytes: 64 * 1024,
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            offset: 1_000,
            delimiter: ',',
            header_rows: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[VAT-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("vat").join("config.toml");
        let data = home_dir.join(".local").join("share").join("vat");
        Self {
            config_file: cfg,
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| VatError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(VatError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// Uses FNV-1a for cross-process-stable hashing (no `DefaultHasher`
    /// whose seed may vary across Rust releases).
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(env_var)
    }

    /// Apply `VAT_*` overrides through an injectable lookup (tests pass a map).
    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // reproc
        if let Some(raw) = lookup("VAT_REPROC_ROOT") {
            self.reproc.root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("VAT_POST_PROCESSING_ROOT") {
            self.reproc.post_processing_root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("VAT_ENV_FILE_NAME") {
            self.reproc.env_file_name = raw;
        }
        if let Some(raw) = lookup("VAT_BACKUP_DIR_NAME") {
            self.reproc.backup_dir_name = raw;
        }
        if let Some(raw) = lookup("VAT_REVIEW_ARTIFACT_PREFIX") {
            self.reproc.review_artifact_prefix = raw;
        }

        // archive
        if let Some(raw) = lookup("VAT_ARCHIVE_ROOT") {
            self.archive.root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("VAT_ARCHIVE_HEADER_SCAN_BYTES") {
            self.archive.header_scan_bytes = parse_env_usize("VAT_ARCHIVE_HEADER_SCAN_BYTES", &raw)?;
        }

        // mutation
        if let Some(raw) = lookup("VAT_MUTATION_OFFSET") {
            self.mutation.offset = parse_env_i64("VAT_MUTATION_OFFSET", &raw)?;
        }
        if let Some(raw) = lookup("VAT_MUTATION_DELIMITER") {
            self.mutation.delimiter = parse_env_char("VAT_MUTATION_DELIMITER", &raw)?;
        }
        if let Some(raw) = lookup("VAT_MUTATION_HEADER_ROWS") {
            self.mutation.header_rows = parse_env_usize("VAT_MUTATION_HEADER_ROWS", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("VAT_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Normalize paths for consistent comparison.
    fn normalize_paths(&mut self) {
        for path in [
            &mut self.reproc.root,
            &mut self.reproc.post_processing_root,
            &mut self.archive.root,
        ] {
            let s = path.to_string_lossy();
            if s.len() > 1
                && let Some(stripped) = s.strip_suffix('/')
            {
                *path = PathBuf::from(stripped);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mutation.offset == 0 {
            return Err(VatError::InvalidConfig {
                details: "mutation.offset must be non-zero; a zero offset cannot change any value"
                    .to_string(),
            });
        }

        let delim = self.mutation.delimiter;
        if !delim.is_ascii() || delim == '\n' || delim == '\r' || delim == '"' {
            return Err(VatError::InvalidConfig {
                details: format!(
                    "mutation.delimiter must be a plain ASCII separator, got {delim:?}"
                ),
            });
        }

        validate_file_name("reproc.env_file_name", &self.reproc.env_file_name)?;
        validate_file_name("reproc.backup_dir_name", &self.reproc.backup_dir_name)?;

        // The prefix selects files for deletion; empty would match everything.
        if self.reproc.review_artifact_prefix.is_empty() {
            return Err(VatError::InvalidConfig {
                details: "reproc.review_artifact_prefix must not be empty".to_string(),
            });
        }

        if self.archive.raw_level_suffix.is_empty() {
            return Err(VatError::InvalidConfig {
                details: "archive.raw_level_suffix must not be empty".to_string(),
            });
        }

        if self.archive.header_scan_bytes < 1024 {
            return Err(VatError::InvalidConfig {
                details: format!(
                    "archive.header_scan_bytes ({}) must be >= 1024 to cover real headers",
                    self.archive.header_scan_bytes,
                ),
            });
        }

        Ok(())
    }
}

fn validate_file_name(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(VatError::InvalidConfig {
            details: format!("{name} must not be empty"),
        });
    }
    if value.contains('/') {
        return Err(VatError::InvalidConfig {
            details: format!("{name} must be a bare file name, got {value:?}"),
        });
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>()
        .map_err(|error| VatError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_i64(name: &str, raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|error| VatError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_char(name: &str, raw: &str) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(VatError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected exactly one character"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, VatError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_mutation_knobs_match_the_documented_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.mutation.offset, 1_000);
        assert_eq!(cfg.mutation.delimiter, ',');
        assert_eq!(cfg.mutation.header_rows, 0);
        assert_eq!(cfg.reproc.backup_dir_name, ".autotest");
        assert_eq!(cfg.reproc.env_file_name, "env.bash");
        assert_eq!(cfg.reproc.review_artifact_prefix, "ncr");
        assert_eq!(cfg.archive.raw_level_suffix, "00");
    }

    #[test]
    fn zero_offset_rejected() {
        let mut cfg = Config::default();
        cfg.mutation.offset = 0;
        let err = cfg.validate().expect_err("expected offset error");
        match err {
            VatError::InvalidConfig { details } => assert!(details.contains("offset")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn newline_delimiter_rejected() {
        let mut cfg = Config::default();
        cfg.mutation.delimiter = '\n';
        let err = cfg.validate().expect_err("expected delimiter error");
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn backup_dir_with_separator_rejected() {
        let mut cfg = Config::default();
        cfg.reproc.backup_dir_name = "a/b".to_string();
        let err = cfg.validate().expect_err("expected name error");
        assert!(err.to_string().contains("backup_dir_name"));
    }

    #[test]
    fn empty_review_prefix_rejected() {
        let mut cfg = Config::default();
        cfg.reproc.review_artifact_prefix = String::new();
        let err = cfg.validate().expect_err("expected prefix error");
        assert!(err.to_string().contains("review_artifact_prefix"));
    }

    #[test]
    fn tiny_header_scan_rejected() {
        let mut cfg = Config::default();
        cfg.archive.header_scan_bytes = 16;
        let err = cfg.validate().expect_err("expected scan size error");
        assert!(err.to_string().contains("header_scan_bytes"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("VAT_REPROC_ROOT", "/srv/reproc"),
            ("VAT_ARCHIVE_ROOT", "/srv/archive"),
            ("VAT_MUTATION_OFFSET", "250"),
            ("VAT_MUTATION_DELIMITER", ";"),
        ]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");

        assert_eq!(cfg.reproc.root, PathBuf::from("/srv/reproc"));
        assert_eq!(cfg.archive.root, PathBuf::from("/srv/archive"));
        assert_eq!(cfg.mutation.offset, 250);
        assert_eq!(cfg.mutation.delimiter, ';');
    }

    #[test]
    fn env_invalid_offset_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("VAT_MUTATION_OFFSET", "plenty")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid i64 should fail");
        match err {
            VatError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("VAT_MUTATION_OFFSET"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_multichar_delimiter_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("VAT_MUTATION_DELIMITER", "||")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("two chars should fail");
        assert!(err.to_string().contains("exactly one character"));
    }

    #[test]
    fn normalize_paths_trims_trailing_slashes_and_keeps_root() {
        let mut cfg = Config::default();
        cfg.reproc.root = PathBuf::from("/reproc/");
        cfg.archive.root = PathBuf::from("/");

        cfg.normalize_paths();

        assert_eq!(cfg.reproc.root, PathBuf::from("/reproc"));
        assert_eq!(cfg.archive.root, PathBuf::from("/"));
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/vat/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, VatError::MissingConfig { .. }));
    }

    #[test]
    fn load_reads_toml_and_applies_defaults_for_missing_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[mutation]\noffset = 42\n\n[archive]\nroot = \"/mnt/archive/\"\n",
        )
        .expect("write config");

        let cfg = Config::load(Some(&path)).expect("load should succeed");
        assert_eq!(cfg.mutation.offset, 42);
        assert_eq!(cfg.mutation.delimiter, ',');
        assert_eq!(cfg.archive.root, PathBuf::from("/mnt/archive"));
        assert_eq!(cfg.paths.config_file, path);
    }

    #[test]
    fn stable_hash_deterministic() {
        let cfg = Config::default();
        let h1 = cfg.stable_hash().expect("hash");
        let h2 = cfg.stable_hash().expect("hash");
        assert_eq!(h1, h2);
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let hash_before = cfg.stable_hash().expect("hash should compute");
        let mut modified = Config::default();
        modified.mutation.offset += 1;
        let hash_after = modified.stable_hash().expect("hash should compute");
        assert_ne!(hash_before, hash_after);
    }
}
