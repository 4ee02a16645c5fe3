//! Typed nullable columns
//!
//! Every cell is an `Option`; a `None` is the table's null. Float columns
//! never hold NaN, a NaN produced by arithmetic is stored as null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashSet;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%d %b %Y",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

impl Column {
    /// Float column, folding NaN into null
    pub fn float(values: Vec<Option<f64>>) -> Self {
        Column::Float(
            values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// dtype name as reported in profiles
    pub fn dtype(&self) -> &'static str {
        match self {
            Column::Int(_) => "int64",
            Column::Float(_) => "float64",
            Column::Bool(_) => "bool",
            Column::Str(_) => "object",
            Column::DateTime(_) => "datetime64[ns]",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Int(_) | Column::Float(_) | Column::Bool(_))
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Column::Int(v) => v[row].is_none(),
            Column::Float(v) => v[row].is_none(),
            Column::Bool(v) => v[row].is_none(),
            Column::Str(v) => v[row].is_none(),
            Column::DateTime(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// String rendering of one cell, `None` for null
    pub fn render(&self, row: usize) -> Option<String> {
        match self {
            Column::Int(v) => v[row].map(|x| x.to_string()),
            Column::Float(v) => v[row].map(format_float),
            Column::Bool(v) => v[row].map(|b| if b { "True" } else { "False" }.to_string()),
            Column::Str(v) => v[row].clone(),
            Column::DateTime(v) => v[row].map(format_datetime),
        }
    }

    /// Every cell rendered, nulls kept
    pub fn to_strings(&self) -> Vec<Option<String>> {
        (0..self.len()).map(|i| self.render(i)).collect()
    }

    /// Numeric coercion; unparseable cells become null
    pub fn to_numeric(&self) -> Vec<Option<f64>> {
        match self {
            Column::Int(v) => v.iter().map(|x| x.map(|i| i as f64)).collect(),
            Column::Float(v) => v.clone(),
            Column::Bool(v) => v.iter().map(|x| x.map(|b| if b { 1.0 } else { 0.0 })).collect(),
            Column::Str(v) => v
                .iter()
                .map(|x| x.as_deref().and_then(parse_number))
                .collect(),
            Column::DateTime(v) => v
                .iter()
                .map(|x| x.and_then(|d| d.and_utc().timestamp_nanos_opt()).map(|n| n as f64))
                .collect(),
        }
    }

    /// Datetime coercion; unparseable cells become null
    pub fn to_datetimes(&self) -> Vec<Option<NaiveDateTime>> {
        match self {
            Column::DateTime(v) => v.clone(),
            Column::Str(v) => v
                .iter()
                .map(|x| x.as_deref().and_then(parse_datetime))
                .collect(),
            // Numbers and booleans carry no calendar information
            _ => vec![None; self.len()],
        }
    }

    /// Count of distinct non-null values
    pub fn nunique(&self) -> usize {
        let distinct: HashSet<String> = self.to_strings().into_iter().flatten().collect();
        distinct.len()
    }

    /// Up to `limit` distinct non-null values in first-seen order
    pub fn sample(&self, limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut sample = Vec::new();
        for value in self.to_strings().into_iter().flatten() {
            if sample.len() == limit {
                break;
            }
            if seen.insert(value.clone()) {
                sample.push(value);
            }
        }
        sample
    }

    /// JSON value of one cell
    pub fn cell_json(&self, row: usize) -> Value {
        match self {
            Column::Int(v) => v[row].map_or(Value::Null, Value::from),
            Column::Float(v) => v[row].map_or(Value::Null, Value::from),
            Column::Bool(v) => v[row].map_or(Value::Null, Value::from),
            Column::Str(v) => v[row].clone().map_or(Value::Null, Value::from),
            Column::DateTime(v) => v[row].map_or(Value::Null, |d| Value::from(format_datetime(d))),
        }
    }

    /// Rows at `indices`, in that order
    pub fn take(&self, indices: &[usize]) -> Column {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Column::Int(v) => Column::Int(pick(v, indices)),
            Column::Float(v) => Column::Float(pick(v, indices)),
            Column::Bool(v) => Column::Bool(pick(v, indices)),
            Column::Str(v) => Column::Str(pick(v, indices)),
            Column::DateTime(v) => Column::DateTime(pick(v, indices)),
        }
    }
}

/// Float rendering that keeps a trailing `.0` on whole numbers
pub fn format_float(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a number the way a lenient numeric coercion would; NaN is null
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse common date and datetime spellings
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
