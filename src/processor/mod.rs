use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod context;
pub mod log;
pub mod memory;
pub mod parts;
pub mod report;
pub mod sequential;

/// Lines per in-memory batch unless overridden in [`RunConfig`].
pub const DEFAULT_BATCH_LINES: usize = 10_000;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("input file has no header line: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("bad column selection: {0}")]
    BadColumnSpec(String),

    #[error("column not found in header: {0}")]
    ColumnNotFound(String),

    #[error("number of parts must be greater than zero")]
    InvalidParts,

    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),
}

/// Per-run row accounting.
///
/// `valid_lines` counts rows written to the output; `error_lines` counts
/// rows dropped for a wrong column count. Rows rejected by the filter
/// are neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub valid_lines: u64,
    pub error_lines: u64,
}

impl RowStats {
    pub fn merge(&mut self, other: RowStats) {
        self.valid_lines += other.valid_lines;
        self.error_lines += other.error_lines;
    }
}

/// The configuration every engine consumes.
///
/// # Example
///
/// ```
/// use csv_sieve::processor::RunConfig;
///
/// let config = RunConfig::new("in.csv", "out.csv")
///     .columns("3,1")
///     .filter("age >= 18")
///     .parts(4);
/// assert_eq!(config.resolve_parts(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns_spec: Option<String>,
    pub filter_expression: Option<String>,
    pub parts: Option<usize>,
    pub separator: char,
    pub batch_lines: usize,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        RunConfig {
            input: input.into(),
            output: output.into(),
            columns_spec: None,
            filter_expression: None,
            parts: None,
            separator: ',',
            batch_lines: DEFAULT_BATCH_LINES,
        }
    }

    /// Column selection: `"*"` or a 1-based comma-separated index list.
    pub fn columns(mut self, spec: impl Into<String>) -> Self {
        self.columns_spec = Some(spec.into());
        self
    }

    /// Row filter expression, e.g. `age >= 18 AND city = "Roma"`.
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Number of parts (file-part engine) or workers (in-memory engine).
    pub fn parts(mut self, parts: usize) -> Self {
        self.parts = Some(parts);
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn batch_lines(mut self, batch_lines: usize) -> Self {
        self.batch_lines = batch_lines;
        self
    }

    /// Absent or zero parts fall back to the logical CPU count.
    pub fn resolve_parts(&self) -> usize {
        match self.parts {
            Some(parts) if parts > 0 => parts,
            _ => num_cpus::get().max(1),
        }
    }
}

pub(crate) fn validate_input(path: &Path) -> Result<(), SieveError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SieveError::MissingInput(path.to_path_buf()))
    }
}

/// The run log lives next to the output: `out.csv` → `out.csv.log`.
pub(crate) fn log_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".log");
    PathBuf::from(name)
}
