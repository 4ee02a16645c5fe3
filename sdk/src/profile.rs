//! Profile records
//!
//! Read-only snapshots of the raw artifact, handed to the planner. A profile
//! never contains cleaned values.

use serde::{Deserialize, Serialize};

/// Summary of a table sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularProfile {
    /// Rows actually read for profiling
    pub rows_sampled: usize,

    /// Fraction of sampled rows with at least one null; `None` for no rows
    pub null_row_pct_overall: Option<f64>,

    /// Per-column summaries in table order
    pub columns: Vec<ColumnProfile>,
}

impl TabularProfile {
    /// Find a column summary by name
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,

    /// pandas-style dtype: int64, float64, bool, object or datetime64[ns]
    pub dtype: String,

    /// Fraction of null cells
    pub null_pct: f64,

    /// Distinct non-null values
    pub nunique: usize,

    /// Min/max/mean for numeric columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericStats>,

    /// Up to five distinct non-null values, rendered as strings
    pub sample: Vec<String>,
}

impl ColumnProfile {
    pub fn is_numeric(&self) -> bool {
        self.stats.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Lexical summary of a text document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextProfile {
    pub chars: usize,
    pub words: usize,
    pub avg_word_len: f64,

    /// ISO-639-1 code, or "unknown"
    pub language: String,

    /// Ten most frequent lowercased words with their counts
    pub top_tokens: Vec<(String, usize)>,

    /// Share of lines that repeat elsewhere in the document
    pub boilerplate_ratio: f64,
}

/// Geometry and pixel statistics of an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageProfile {
    pub width: u32,
    pub height: u32,

    /// width / height rounded to three places; 0 for zero height
    pub aspect_ratio: f64,

    pub file_size_bytes: u64,

    /// Per-channel mean, RGB order
    pub mean_pixel: Vec<f64>,

    /// Per-channel population standard deviation, RGB order
    pub std_pixel: Vec<f64>,
}
