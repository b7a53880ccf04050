//! Semantic relatedness oracle
//!
//! The oracle is an external, non-deterministic judge (usually a language
//! model) that rates how related a file is to the target files. It takes a
//! prompt and returns raw text; the scorer reads that text as a bare number.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::core::model::{CtxError, SEMANTIC_CAP};

/// External judge of semantic relatedness
pub trait SemanticOracle {
    /// Submit `prompt` and return the raw response text
    fn call(&self, prompt: &str) -> Result<String, CtxError>;
}

impl<F> SemanticOracle for F
where
    F: Fn(&str) -> Result<String, CtxError>,
{
    fn call(&self, prompt: &str) -> Result<String, CtxError> {
        self(prompt)
    }
}

/// Oracle that is never available. Every semantic score becomes 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

impl SemanticOracle for NoOracle {
    fn call(&self, _prompt: &str) -> Result<String, CtxError> {
        Err(CtxError::oracle("no semantic oracle configured"))
    }
}

/// Oracle backed by a shell command.
///
/// The prompt is written to the command's stdin and its stdout is the
/// response. The command runs to completion; impose any timeout inside the
/// command itself.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: String,
}

impl CommandOracle {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SemanticOracle for CommandOracle {
    fn call(&self, prompt: &str) -> Result<String, CtxError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        // stdout and stderr are drained while the prompt is still being
        // written, so a command that echoes its input cannot fill a pipe
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output?;
        // A command that ignores its input may close stdin early
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CtxError::oracle(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Oracle for an optional shell command; without one, no oracle at all
pub fn oracle_for_command(command: Option<&str>) -> Box<dyn SemanticOracle> {
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => Box::new(CommandOracle::new(command)),
        None => Box::new(NoOracle),
    }
}

/// Build the fixed relatedness prompt.
///
/// `target_context` holds the excerpts of every target file, `excerpt` the
/// excerpt of the file being rated.
pub fn build_prompt(target_context: &str, excerpt: &str) -> String {
    format!(
        r#"Analyze the semantic relationship between the following code and the target files.
Focus on:
1. Shared domain concepts and terminology
2. Similar functionality or purpose
3. Architectural relationships
4. Business logic connections

Target files context:
{target_context}

Code to analyze:
{excerpt}

Rate the semantic relationship strength from 0.0 to {SEMANTIC_CAP:.1}, where:
0.0 = No semantic relationship
0.1-0.2 = Weak semantic relationship (few shared concepts)
0.3-0.4 = Strong semantic relationship (many shared concepts)

Output only the number (e.g. "0.2")."#
    )
}

/// Read a response as a bare floating-point literal clamped to
/// `[0.0, SEMANTIC_CAP]`. Anything else, including NaN and infinities,
/// is `None`.
pub fn parse_semantic_response(response: &str) -> Option<f64> {
    let value: f64 = response.trim().parse().ok()?;
    value
        .is_finite()
        .then(|| value.clamp(0.0, SEMANTIC_CAP))
}
