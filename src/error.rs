use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Conditions a caller needs to tell apart. Anything else travels as
/// `anyhow::Error` with context attached.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("input directory {0:?} does not exist or is not a directory")]
    InputDirectoryMissing(PathBuf),

    #[error("output location {path:?} is not writable: {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    #[error("alias `{alias}` -> `{target}`: {reason}")]
    InvalidAlias {
        alias: String,
        target: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0:?} contains no tables")]
    NoTables(PathBuf),

    #[error("unsupported file extension for {0:?}")]
    UnsupportedExtension(PathBuf),
}

impl PipelineError {
    /// Configuration problems are fatal for the run and are reported before
    /// any file is read.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidDateRange { .. }
                | PipelineError::InputDirectoryMissing(_)
                | PipelineError::OutputNotWritable { .. }
                | PipelineError::InvalidAlias { .. }
                | PipelineError::Config(_)
        )
    }
}
