//! Error types for loading, validating and reporting.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Validation failures. `EmptyCandidateSet` and `MissingColumn` are fatal for
/// a run; the rest are row-scoped and end up as a failed report row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("candidate set is empty: no test cases to match against")]
    EmptyCandidateSet,
    #[error("{table} table is missing required column `{column}`")]
    MissingColumn { table: String, column: String },
    #[error("judgment unavailable: {0}")]
    JudgmentUnavailable(String),
    #[error("match unavailable: {0}")]
    MatchUnavailable(String),
    #[error("row timed out after {0:?}")]
    RowTimeout(Duration),
}

impl ValidationError {
    /// True for errors that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EmptyCandidateSet | Self::MissingColumn { .. })
    }
}

/// Failures reading an input table or document.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },
    #[error("failed to read csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("{0} contains no header row")]
    EmptyTable(PathBuf),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failures writing the report artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to prepare report directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Failures building configuration or backends.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown {kind} backend `{name}`")]
    UnknownBackend { kind: &'static str, name: String },
    #[error("backend setup failed: {0}")]
    Backend(#[from] stlc_llm::LlmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_fatal() {
        assert!(ValidationError::EmptyCandidateSet.is_fatal());
        assert!(
            ValidationError::MissingColumn { table: "mapping".into(), column: "Requirement_ID".into() }
                .is_fatal()
        );
        assert!(!ValidationError::JudgmentUnavailable("down".into()).is_fatal());
        assert!(!ValidationError::MatchUnavailable("down".into()).is_fatal());
        assert!(!ValidationError::RowTimeout(Duration::from_secs(5)).is_fatal());
    }

    #[test]
    fn missing_column_names_table_and_column() {
        let e = ValidationError::MissingColumn {
            table: "testcase".into(),
            column: "TestCase_Description".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("testcase"));
        assert!(msg.contains("TestCase_Description"));
    }
}
