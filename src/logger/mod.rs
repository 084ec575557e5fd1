//! Run logging: operator echo on stdout + JSONL activity log.
//!
//! The echo channel is the operator-facing narration of the run and is
//! switched off in quiet and JSON output modes; the JSONL channel is the
//! machine-readable record and is written whenever a log path is
//! configured. Neither channel can fail the run.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::path::Path;

pub mod jsonl;

pub use jsonl::{EventType, JsonlWriter, LogEntry, Severity};

/// Both logging channels of a single run.
pub struct RunLog {
    echo: bool,
    jsonl: Option<JsonlWriter>,
}

impl RunLog {
    /// `echo` narrates to stdout; `jsonl_path` appends structured events.
    #[must_use]
    pub fn new(echo: bool, jsonl_path: Option<&Path>) -> Self {
        Self {
            echo,
            jsonl: jsonl_path.map(JsonlWriter::open),
        }
    }

    /// No narration, no file. For tests and helper subcommands.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            echo: false,
            jsonl: None,
        }
    }

    /// Operator-facing line, echo channel only.
    pub fn echo(&mut self, line: &str) {
        if self.echo {
            let _ = writeln!(io::stdout(), "{line}");
        }
    }

    /// Structured event, JSONL channel only.
    pub fn record(&mut self, entry: LogEntry) {
        if let Some(writer) = self.jsonl.as_mut() {
            writer.write_entry(&entry);
        }
    }

    /// A run stage: narrate and record in one call.
    pub fn stage(&mut self, entry: LogEntry, line: &str) {
        self.echo(line);
        self.record(entry);
    }

    pub fn flush(&mut self) {
        if self.echo {
            let _ = io::stdout().flush();
        }
        if let Some(writer) = self.jsonl.as_mut() {
            writer.flush();
        }
    }

    /// Degradation state of the JSONL channel, if one is open.
    #[must_use]
    pub fn jsonl_state(&self) -> Option<&str> {
        self.jsonl.as_ref().map(JsonlWriter::state)
    }
}
