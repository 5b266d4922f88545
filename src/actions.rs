//! GitHub Actions workflow commands and step outputs.
//!
//! Inside a workflow run, annotations are workflow commands written to
//! stdout (`::notice::message`) and step outputs are `name=value` lines
//! appended to the file named by `GITHUB_OUTPUT`. Outside Actions both are
//! skipped so local runs only print the plain summary line.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};

use camino::Utf8PathBuf;

use crate::github::error::IntakeError;

/// Set to `true` by the Actions runner for every step.
pub const ACTIONS_ENV: &str = "GITHUB_ACTIONS";

/// Names the file that collects step outputs.
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

const MULTILINE_DELIMITER: &str = "PRSNAP_OUTPUT_EOF";

/// Severity of a workflow annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    /// Informational message shown on the run summary.
    Notice,
    /// Warning shown on the run summary.
    Warning,
    /// Error shown on the run summary.
    Error,
}

impl Annotation {
    const fn command(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Whether the process runs as a GitHub Actions step.
#[must_use]
pub fn running_in_actions() -> bool {
    env::var(ACTIONS_ENV).is_ok_and(|value| value == "true")
}

/// Writes one annotation as a workflow command.
///
/// Percent signs and line breaks in `message` are escaped so a multi-line
/// error stays a single command.
///
/// # Errors
///
/// Returns any error raised by `writer`.
pub fn write_annotation<W: Write>(
    writer: &mut W,
    level: Annotation,
    message: &str,
) -> io::Result<()> {
    writeln!(writer, "::{}::{}", level.command(), escape_data(message))
}

fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Step outputs published once the note is stored.
///
/// # Example
///
/// ```
/// use prsnap::actions::StepOutputs;
///
/// let outputs = StepOutputs::default()
///     .with("pr_number", "42")
///     .with("notes_ref", "refs/notes/pr-summary");
/// let mut buffer = Vec::new();
/// outputs.write_to(&mut buffer).expect("writing to a Vec succeeds");
/// assert_eq!(
///     String::from_utf8(buffer).expect("outputs are UTF-8"),
///     "pr_number=42\nnotes_ref=refs/notes/pr-summary\n"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutputs {
    entries: Vec<(String, String)>,
}

impl StepOutputs {
    /// Adds an output, keeping insertion order.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.entries.push((name.to_owned(), value.into()));
        self
    }

    /// Writes every output in the `GITHUB_OUTPUT` file format.
    ///
    /// Values containing a line break use the delimited form
    /// (`name<<DELIMITER`).
    ///
    /// # Errors
    ///
    /// Returns any error raised by `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (name, value) in &self.entries {
            if value.contains('\n') {
                writeln!(
                    writer,
                    "{name}<<{MULTILINE_DELIMITER}\n{value}\n{MULTILINE_DELIMITER}"
                )?;
            } else {
                writeln!(writer, "{name}={value}")?;
            }
        }
        Ok(())
    }

    /// Appends the outputs to the file named by `GITHUB_OUTPUT`.
    ///
    /// Returns the file written, or `None` when the variable is unset or
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Io`] when the output file cannot be opened or
    /// written.
    pub fn publish(&self) -> Result<Option<Utf8PathBuf>, IntakeError> {
        let Some(path) = env::var(OUTPUT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from)
        else {
            return Ok(None);
        };

        let io_error = |error: io::Error| IntakeError::Io {
            message: format!("failed to write step outputs to {path}: {error}"),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(io_error)?;
        self.write_to(&mut file).map_err(io_error)?;
        Ok(Some(path))
    }
}
