#![forbid(unsafe_code)]

//! varmap_autotest (vat) — regression-test automation for raw datastream
//! ingests.
//!
//! Given a case working directory full of raw input files, the tool stages a
//! variable-mapping regression test end to end:
//! 1. **Context** — case ID, datastream, and site inferred from the path,
//!    confirmed by the operator
//! 2. **Command recovery** — the exact production ingest invocation pulled out
//!    of archived processed-output metadata
//! 3. **Staging** — inputs backed up, stale review artifacts cleared, and one
//!    raw column offset so the remapped variable is recognizable downstream
//!
//! The recovered command is re-emitted, never executed; running the ingest and
//! comparing its output stay external steps.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use varmap_autotest::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use varmap_autotest::core::config::Config;
//! use varmap_autotest::context::infer_from_path;
//! ```

pub mod prelude;

pub mod archive;
pub mod cleanup;
pub mod context;
pub mod core;
pub mod environment;
pub mod inputs;
pub mod logger;
pub mod mutate;
pub mod orchestrator;
