//! Context resolution strategies: interactive confirmation or auto-accept.
//!
//! Nothing on disk is touched until the operator (or an explicit flag) has
//! confirmed which case and datastream the run is about, so resolution is the
//! one blocking checkpoint in the pipeline. The strategy is injectable: the
//! CLI picks the console prompt on a terminal and auto-accept otherwise,
//! tests pass scripted readers.

#![allow(missing_docs)]

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use crate::context::{PathInference, TestContext};
use crate::core::errors::{Result, VatError};

/// Answers treated as a yes at the confirmation prompt.
pub const ACCEPTED_ANSWERS: [&str; 4] = ["y", "yes", "yea", "ok"];

/// Strategy turning a path inference into a confirmed context.
pub trait ContextPrompt {
    fn resolve(&mut self, inference: PathInference) -> Result<TestContext>;
}

/// Non-interactive strategy: a complete inference passes through untouched,
/// anything less is an error.
#[derive(Debug, Default)]
pub struct AutoAccept;

impl ContextPrompt for AutoAccept {
    fn resolve(&mut self, inference: PathInference) -> Result<TestContext> {
        inference
            .complete()
            .ok_or_else(|| VatError::ContextUnresolved {
                path: inference.path.clone(),
                details: inference.describe_gaps(),
            })
    }
}

/// Interactive strategy over arbitrary reader/writer pairs.
///
/// Shows the inferred identifiers and asks for a yes; on a no (or when the
/// scan came up short) it asks for replacement values, which must satisfy the
/// identifier grammars.
#[derive(Debug)]
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<BufReader<Stdin>, Stdout> {
    /// Prompt wired to the process stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            input: BufReader::new(io::stdin()),
            output: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").map_err(|e| VatError::io("<stdout>", e))?;
        self.output.flush().map_err(|e| VatError::io("<stdout>", e))?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| VatError::io("<stdin>", e))?;
        if read == 0 {
            return Err(VatError::ContextRejected {
                details: "input closed before the context was confirmed".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }

    fn ask_replacement(&mut self) -> Result<TestContext> {
        let case_id = self
            .ask("Enter the case ID (example D180042.4): ")?
            .parse()?;
        let datastream = self
            .ask("Enter the raw datastream (example sgp30ebbrC1.00): ")?
            .parse()?;
        Ok(TestContext {
            case_id,
            datastream,
        })
    }
}

impl<R: BufRead, W: Write> ContextPrompt for ConsolePrompt<R, W> {
    fn resolve(&mut self, inference: PathInference) -> Result<TestContext> {
        if let Some(ctx) = inference.complete() {
            writeln!(self.output, "Case ID        = {}", ctx.case_id)
                .and_then(|()| writeln!(self.output, "Raw datastream = {}", ctx.datastream))
                .map_err(|e| VatError::io("<stdout>", e))?;
            let answer = self.ask("Is this correct? [y/n] ")?;
            if ACCEPTED_ANSWERS.contains(&answer.to_lowercase().as_str()) {
                return Ok(ctx);
            }
        } else {
            writeln!(
                self.output,
                "Could not infer the test context from {}: {}",
                inference.path.display(),
                inference.describe_gaps()
            )
            .map_err(|e| VatError::io("<stdout>", e))?;
        }
        self.ask_replacement()
    }
}
