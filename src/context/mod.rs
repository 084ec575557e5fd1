//! Test context: typed case and datastream identifiers inferred from a path.
//!
//! A case working directory encodes everything the run needs to know:
//! `<reproc_root>/<case_id>/<datastream>/` holds the raw inputs, so the case
//! ID and datastream can be read straight out of the path. Both identifiers
//! have a declared grammar and parse into typed wrappers; anything that does
//! not match is a diagnostic, never a guess.

#![allow(missing_docs)]

pub mod confirm;
#[cfg(test)]
mod test_properties;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;

use crate::core::errors::{Result, VatError};

/// Three-letter observatory codes a datastream name may start with.
pub const SITE_CODES: [&str; 37] = [
    "acx", "awr", "dmf", "fkb", "gec", "hfe", "mag", "mar", "mlo", "nic", "nsa", "osc", "pgh",
    "pye", "sbs", "shb", "tmp", "wbu", "zrh", "asi", "cjc", "ena", "gan", "grw", "isp", "mao",
    "mcq", "nac", "nim", "oli", "osi", "pvc", "rld", "sgp", "smt", "twp", "yeu",
];

/// Case identifier: `D` + 6 digits + optional `.` revision digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CaseId(String);

/// Datastream identifier: site code, instrument body, `.`, 2-char level.
///
/// Example: `sgp30ebbrC1.00` — site `sgp`, level `00`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DatastreamId(String);

/// A confirmed pair of identifiers; everything downstream keys off this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestContext {
    pub case_id: CaseId,
    pub datastream: DatastreamId,
}

/// What a path scan found, kept with the path for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PathInference {
    pub case_id: Option<CaseId>,
    pub datastream: Option<DatastreamId>,
    pub path: PathBuf,
}

const CASE_ID_GRAMMAR: &str = r"D[0-9]{6}(?:\.[0-9]+)?";
const DATE_TOKEN_GRAMMAR: &str = r"[12][0-9]{7}";

/// Compiled identifier grammars, built once per scan.
#[derive(Debug)]
pub struct ContextPatterns {
    case_id: Regex,
    datastream: Regex,
    date_token: Regex,
}

impl ContextPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            case_id: compile(CASE_ID_GRAMMAR)?,
            datastream: compile(&datastream_grammar())?,
            date_token: compile(DATE_TOKEN_GRAMMAR)?,
        })
    }

    /// First case-id match inside `hay`, if any.
    #[must_use]
    pub fn find_case_id(&self, hay: &str) -> Option<CaseId> {
        self.case_id.find(hay).map(|m| CaseId(m.as_str().to_string()))
    }

    /// First datastream match inside `hay`, if any.
    #[must_use]
    pub fn find_datastream(&self, hay: &str) -> Option<DatastreamId> {
        self.datastream
            .find(hay)
            .map(|m| DatastreamId(m.as_str().to_string()))
    }

    /// First 8-digit date token inside `hay`, if any.
    #[must_use]
    pub fn find_date_token(&self, hay: &str) -> Option<String> {
        self.date_token.find(hay).map(|m| m.as_str().to_string())
    }
}

fn datastream_grammar() -> String {
    format!("(?:{})[0-9A-Za-z_]+\\.[0-9A-Za-z_]{{2}}", SITE_CODES.join("|"))
}

fn compile(grammar: &str) -> Result<Regex> {
    Regex::new(grammar).map_err(|err| VatError::InvalidConfig {
        details: format!("identifier grammar {grammar:?} failed to compile: {err}"),
    })
}

fn is_full_match(grammar: &str, value: &str) -> Result<bool> {
    let anchored = compile(&format!("^(?:{grammar})$"))?;
    Ok(anchored.is_match(value))
}

impl CaseId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CaseId {
    type Err = VatError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if is_full_match(CASE_ID_GRAMMAR, trimmed)? {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(VatError::ContextRejected {
                details: format!(
                    "{trimmed:?} is not a case ID (expected D followed by 6 digits, optionally .N)"
                ),
            })
        }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl DatastreamId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three-letter site code prefix.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.0[..3]
    }

    /// Two-char processing level suffix (`00` marks raw data).
    #[must_use]
    pub fn level(&self) -> &str {
        &self.0[self.0.len() - 2..]
    }

    /// Name with the `.LL` level suffix dropped; archive directories for all
    /// processing levels of this stream start with it.
    #[must_use]
    pub fn archive_prefix(&self) -> &str {
        &self.0[..self.0.len() - 3]
    }
}

impl FromStr for DatastreamId {
    type Err = VatError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if is_full_match(&datastream_grammar(), trimmed)? {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(VatError::ContextRejected {
                details: format!(
                    "{trimmed:?} is not a datastream name (expected <site><instrument>.<level>, e.g. sgp30ebbrC1.00)"
                ),
            })
        }
    }
}

impl fmt::Display for DatastreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TestContext {
    /// Site code derived from the datastream.
    #[must_use]
    pub fn site(&self) -> &str {
        self.datastream.site()
    }
}

impl fmt::Display for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.case_id, self.datastream)
    }
}

impl PathInference {
    /// Both identifiers found: promote to a context.
    #[must_use]
    pub fn complete(&self) -> Option<TestContext> {
        match (&self.case_id, &self.datastream) {
            (Some(case_id), Some(datastream)) => Some(TestContext {
                case_id: case_id.clone(),
                datastream: datastream.clone(),
            }),
            _ => None,
        }
    }

    /// Human-readable list of what the scan failed to find.
    #[must_use]
    pub fn describe_gaps(&self) -> String {
        match (&self.case_id, &self.datastream) {
            (None, None) => "no case ID and no datastream in the path".to_string(),
            (None, Some(_)) => "no case ID in the path".to_string(),
            (Some(_), None) => "no datastream in the path".to_string(),
            (Some(_), Some(_)) => "nothing missing".to_string(),
        }
    }
}

/// Scan a path for the case-id and datastream grammars.
///
/// Matches anywhere in the path string, so both
/// `/reproc/D180042.4/sgp30ebbrC1.00` and a cwd deeper inside the case tree
/// resolve the same way.
pub fn infer_from_path(path: &Path) -> Result<PathInference> {
    let patterns = ContextPatterns::new()?;
    let hay = path.to_string_lossy();
    Ok(PathInference {
        case_id: patterns.find_case_id(&hay),
        datastream: patterns.find_datastream(&hay),
        path: path.to_path_buf(),
    })
}
