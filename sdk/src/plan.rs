//! Plan types
//!
//! A `Plan` is the declarative, externally-sourced half of the pipeline: an
//! ordered list of `OpSpec`s plus the planner's notes. Plans are immutable
//! once produced; executors only read them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Data modality a plan targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Column-oriented delimited text (CSV)
    Tabular,

    /// Plain text or paginated documents
    Text,

    /// Raster images
    Image,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Tabular => write!(f, "tabular"),
            Modality::Text => write!(f, "text"),
            Modality::Image => write!(f, "image"),
        }
    }
}

/// One operation of a plan: `{"op": name, ...params}`
///
/// The op name is not validated here. Unknown names are legal and resolve
/// to a skip outcome at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpSpec(Map<String, Value>);

impl OpSpec {
    /// Create an op with no parameters
    pub fn new(op: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("op".to_string(), Value::String(op.into()));
        Self(map)
    }

    /// Add a parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The op name, or an empty string when `op` is missing or not a string
    pub fn name(&self) -> &str {
        self.0.get("op").and_then(Value::as_str).unwrap_or("")
    }

    /// Look up a raw parameter
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields except `op`
    pub fn params(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != "op")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The op as a JSON object, `op` included
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for OpSpec {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// An ordered, parameterized list of operations plus planner notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Operations, applied strictly in order
    pub ops: Vec<OpSpec>,

    /// Free-form planner notes; fallback plans say so here
    #[serde(default)]
    pub notes: String,

    /// Optional planner rationale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Plan {
    /// Create a plan from ops and notes
    pub fn new(ops: Vec<OpSpec>, notes: impl Into<String>) -> Self {
        Self {
            ops,
            notes: notes.into(),
            reasoning: None,
        }
    }

    /// Attach a rationale
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
