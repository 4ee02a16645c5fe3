//! Tidyflow SDK
//!
//! The serializable contract of the plan-then-apply pipeline: plans, execution
//! logs, profiles and the error taxonomy. Used by the engine and by callers
//! that produce plans or consume execution logs.

/// Error types and handling
pub mod errors;

/// Execution log types
pub mod log;

/// Plan types
pub mod plan;

/// Profile records
pub mod profile;

// Re-export commonly used types
pub use errors::{ErrorExt, PipelineError, StepError};
pub use log::{ExecutionLogEntry, StepStatus};
pub use plan::{Modality, OpSpec, Plan};
pub use profile::{ColumnProfile, ImageProfile, NumericStats, TabularProfile, TextProfile};
