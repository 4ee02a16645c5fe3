//! Error types and handling
//!
//! This module provides the error taxonomy used by every pipeline stage.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether the error is absorbed by the pipeline.
//!
//! # Error Categories
//!
//! - **Input**: the raw artifact could not be read or decoded. Fatal for the
//!   artifact, never recorded as a log entry.
//! - **Planner**: plan generation failed. Recovered by substituting the
//!   modality fallback plan.
//! - **Step**: one operation failed for its parameters and the current
//!   artifact state. Recorded as a `status: "error"` log entry.
//! - **Unknown operation**: recorded as a `status: "skip"` log entry.
//!
//! # Examples
//!
//! ```
//! use tidyflow_sdk::errors::{ErrorExt, PipelineError, StepError};
//!
//! let error = PipelineError::Input("not a PNG".to_string());
//! assert!(!error.is_recoverable());
//!
//! let step = PipelineError::from(StepError::ColumnNotNumeric("city".to_string()));
//! assert!(step.is_recoverable());
//! println!("Hint: {}", step.user_hint());
//! ```

use thiserror::Error;

/// Trait for pipeline error extensions
///
/// Provides a hint that is safe to show to end users and whether the
/// pipeline keeps going after the error.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the pipeline recovers from the error locally
    fn is_recoverable(&self) -> bool;
}

/// Main pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    // Artifact errors
    #[error("Input error: {0}")]
    Input(String),

    // Plan generation errors
    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Output errors
    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single plan operation
///
/// The executor turns every `StepError` into a `status: "error"` log entry
/// carrying the display message, then moves on to the next operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StepError {
    #[error("invalid parameters for '{op}': {reason}")]
    InvalidParams { op: String, reason: String },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' is not numeric")]
    ColumnNotNumeric(String),

    #[error("column '{0}' has no non-null numeric values")]
    EmptyColumn(String),

    #[error("cannot safely cast non-integral value {value} in column '{column}' to int")]
    LossyIntCast { column: String, value: f64 },

    #[error("cannot fill column '{column}' with '{value}'")]
    IncompatibleFill { column: String, value: String },

    #[error("stopword language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("kernel size {ksize} is invalid for {method} filter")]
    InvalidKernel { method: String, ksize: i64 },

    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: i64, height: i64 },

    #[error("failed to persist output: {0}")]
    Persist(String),

    #[error("{0}")]
    Failed(String),
}

impl ErrorExt for PipelineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Input(_) => "The file could not be read. Check its format and encoding",
            Self::Planner(_) => "Plan generation failed. A default plan was used instead",
            Self::Step(_) => "One operation failed. See the execution log for details",
            Self::UnknownOperation(_) => "The plan named an operation that does not exist",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Output(_) => "Writing the cleaned output failed. Check the output path",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Fatal for the artifact
            Self::Input(_) | Self::Config(_) | Self::Output(_) | Self::Io(_) => false,

            // Absorbed into the log or a substituted plan
            _ => true,
        }
    }
}

impl ErrorExt for StepError {
    fn user_hint(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => "The operation parameters are malformed",
            Self::ColumnNotFound(_) => "The operation named a column that does not exist",
            Self::ColumnNotNumeric(_) | Self::EmptyColumn(_) => {
                "The operation needs a numeric column with values"
            }
            Self::LossyIntCast { .. } => "Round the column before casting it to int",
            Self::IncompatibleFill { .. } => "The fill value does not match the column type",
            Self::UnsupportedLanguage(_) => "Use a supported stopword language such as 'en'",
            Self::InvalidKernel { .. } => "Use an odd kernel size",
            Self::InvalidSize { .. } => "Target dimensions must be positive",
            Self::Persist(_) => "Writing the step output failed",
            Self::Failed(_) => "The operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}
