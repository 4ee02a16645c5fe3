//! Execution log types
//!
//! Every plan operation contributes one or more `ExecutionLogEntry`s, in plan
//! order. The op-specific diagnostic fields are flattened next to `op` and
//! `status` when serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Outcome of one operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Applied
    Ok,

    /// Not applied (unknown op, missing target)
    Skip,

    /// Failed; the artifact is left as it was before the step
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Ok => write!(f, "ok"),
            StepStatus::Skip => write!(f, "skip"),
            StepStatus::Error => write!(f, "error"),
        }
    }
}

/// One record of the execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Operation name (`augment_<label>` for augmentation variants)
    pub op: String,

    pub status: StepStatus,

    /// Diagnostic fields specific to the op
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ExecutionLogEntry {
    /// Entry for a successfully applied op
    pub fn ok(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            status: StepStatus::Ok,
            details: Map::new(),
        }
    }

    /// Entry for a skipped op
    pub fn skip(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            status: StepStatus::Skip,
            details: Map::new(),
        }
        .with("reason", reason.into())
    }

    /// Entry for a failed op
    pub fn error(op: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            status: StepStatus::Error,
            details: Map::new(),
        }
        .with("error", error.into())
    }

    /// Add a diagnostic field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a diagnostic field
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn is_ok(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serializes_flat() {
        let entry = ExecutionLogEntry::ok("outliers")
            .with("col", "price")
            .with("num_outliers", 1);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            value,
            json!({"op": "outliers", "status": "ok", "col": "price", "num_outliers": 1})
        );
    }

    #[test]
    fn test_skip_and_error_carry_reason() {
        let skip = ExecutionLogEntry::skip("warp", "unknown");
        assert_eq!(skip.status, StepStatus::Skip);
        assert_eq!(skip.detail("reason"), Some(&json!("unknown")));

        let error = ExecutionLogEntry::error("cast", "boom");
        assert_eq!(error.status, StepStatus::Error);
        assert_eq!(error.detail("error"), Some(&json!("boom")));
        assert!(!error.is_ok());
    }
}
