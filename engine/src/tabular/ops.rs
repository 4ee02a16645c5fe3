//! Tabular operation library

use super::column::{format_float, parse_datetime, parse_number, Column};
use super::stats::{mean, median, min_max, non_null, percentile, population_std};
use super::table::Table;
use crate::executor::{Execution, Operation, PlanExecutor, StepHandler};
use sdk::{ExecutionLogEntry, OpSpec, Plan, StepError};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TabularOp {
    DropCols {
        cols: Vec<String>,
    },
    Cast {
        col: String,
        #[serde(default = "default_cast_target")]
        to: String,
    },
    Impute {
        col: String,
        #[serde(default = "default_impute_strategy")]
        strategy: String,
        #[serde(default)]
        value: Option<Value>,
    },
    TrimWhitespace {
        cols: Vec<String>,
    },
    ParseDates {
        col: String,
    },
    Scale {
        cols: Vec<String>,
        #[serde(default = "default_scale_method")]
        method: String,
        #[serde(default)]
        inplace: bool,
        #[serde(default = "default_scale_suffix")]
        suffix: String,
    },
    Outliers {
        cols: Vec<String>,
        #[serde(default = "default_outlier_method")]
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default = "default_outlier_action")]
        action: String,
        #[serde(default = "default_outlier_suffix")]
        suffix: String,
    },
}

fn default_cast_target() -> String {
    "string".to_string()
}

fn default_impute_strategy() -> String {
    "median".to_string()
}

fn default_scale_method() -> String {
    "standard".to_string()
}

fn default_scale_suffix() -> String {
    "_scaled".to_string()
}

fn default_outlier_method() -> String {
    "zscore".to_string()
}

fn default_outlier_action() -> String {
    "cap".to_string()
}

fn default_outlier_suffix() -> String {
    "_outlier".to_string()
}

impl Operation for TabularOp {
    const VOCABULARY: &'static [&'static str] = &[
        "drop_cols",
        "cast",
        "impute",
        "trim_whitespace",
        "parse_dates",
        "scale",
        "outliers",
    ];
}

/// Target of a `cast`; anything unrecognized casts to string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    Float,
    Int,
    Bool,
    DateTime,
    String,
}

impl CastTarget {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "float" => CastTarget::Float,
            "int" => CastTarget::Int,
            "bool" => CastTarget::Bool,
            "datetime" => CastTarget::DateTime,
            _ => CastTarget::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMethod {
    MinMax,
    ZScore,
    Log1p,
}

impl ScaleMethod {
    /// `zscore`, `standard` and unrecognized names all standardize
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "minmax" => ScaleMethod::MinMax,
            "log1p" => ScaleMethod::Log1p,
            _ => ScaleMethod::ZScore,
        }
    }
}

const BOOL_TRUE: &[&str] = &["1", "true", "y", "yes"];

fn column_not_found(op: &str, col: &str) -> ExecutionLogEntry {
    ExecutionLogEntry::skip(op, "column not found").with("col", col)
}

fn require<'a>(table: &'a Table, col: &str) -> Result<&'a Column, StepError> {
    table
        .column(col)
        .ok_or_else(|| StepError::ColumnNotFound(col.to_string()))
}

/// Requested names that exist, first occurrence only
fn existing(table: &Table, cols: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for col in cols {
        if table.contains(col) && !found.contains(col) {
            found.push(col.clone());
        }
    }
    found
}

pub fn drop_cols(table: &mut Table, cols: &[String]) -> ExecutionLogEntry {
    let dropped = existing(table, cols);
    for col in &dropped {
        table.drop_column(col);
    }
    ExecutionLogEntry::ok("drop_cols").with("cols", dropped)
}

pub fn cast(table: &mut Table, col: &str, to: &str) -> Result<ExecutionLogEntry, StepError> {
    if !table.contains(col) {
        return Ok(column_not_found("cast", col));
    }
    let column = require(table, col)?;

    let converted = match CastTarget::parse(to) {
        CastTarget::Float => Column::Float(column.to_numeric()),
        CastTarget::Int => Column::Int(to_ints(col, &column.to_numeric())?),
        CastTarget::Bool => Column::Bool(
            (0..column.len())
                .map(|i| {
                    let rendered = column.render(i).unwrap_or_else(|| "nan".to_string());
                    Some(BOOL_TRUE.contains(&rendered.to_lowercase().as_str()))
                })
                .collect(),
        ),
        CastTarget::DateTime => Column::DateTime(column.to_datetimes()),
        CastTarget::String => Column::Str(column.to_strings()),
    };

    table.set_column(col, converted)?;
    Ok(ExecutionLogEntry::ok("cast").with("col", col).with("to", to))
}

fn to_ints(col: &str, values: &[Option<f64>]) -> Result<Vec<Option<i64>>, StepError> {
    values
        .iter()
        .map(|v| match v {
            None => Ok(None),
            Some(x) if x.is_finite() && x.fract() == 0.0 => Ok(Some(*x as i64)),
            Some(x) => Err(StepError::LossyIntCast {
                column: col.to_string(),
                value: *x,
            }),
        })
        .collect()
}

pub fn impute(
    table: &mut Table,
    col: &str,
    strategy: &str,
    value: Option<&Value>,
) -> Result<ExecutionLogEntry, StepError> {
    if !table.contains(col) {
        return Ok(column_not_found("impute", col));
    }
    let column = require(table, col)?;
    let filled = column.null_count();

    let (imputed, fill) = match strategy.to_lowercase().as_str() {
        stat @ ("median" | "mean") => {
            if !column.is_numeric() {
                return Err(StepError::ColumnNotNumeric(col.to_string()));
            }
            let present = non_null(&column.to_numeric());
            let fill = if stat == "median" {
                median(&present)
            } else {
                mean(&present)
            }
            .ok_or_else(|| StepError::EmptyColumn(col.to_string()))?;
            (fill_column(column, col, &json!(fill))?, json!(fill))
        }
        _ => {
            let literal = value
                .cloned()
                .unwrap_or_else(|| Value::String(strategy.to_string()));
            (fill_column(column, col, &literal)?, literal)
        }
    };

    table.set_column(col, imputed)?;
    Ok(ExecutionLogEntry::ok("impute")
        .with("col", col)
        .with("strategy", strategy)
        .with("value", fill)
        .with("filled", filled))
}

/// Fill nulls with `fill` coerced to the column's type
fn fill_column(column: &Column, col: &str, fill: &Value) -> Result<Column, StepError> {
    let incompatible = || StepError::IncompatibleFill {
        column: col.to_string(),
        value: match fill {
            Value::String(s) => s.clone(),
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| n.to_string(), format_float),
            other => other.to_string(),
        },
    };

    let as_f64 = match fill {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    fn fill_nulls<T: Clone>(values: &[Option<T>], fill: T) -> Vec<Option<T>> {
        values
            .iter()
            .map(|v| Some(v.clone().unwrap_or_else(|| fill.clone())))
            .collect()
    }

    Ok(match column {
        Column::Float(values) => Column::Float(fill_nulls(values, as_f64.ok_or_else(incompatible)?)),
        Column::Int(values) => {
            let fill = as_f64
                .filter(|x| x.is_finite() && x.fract() == 0.0)
                .ok_or_else(incompatible)?;
            Column::Int(fill_nulls(values, fill as i64))
        }
        Column::Bool(values) => {
            let fill = match fill {
                Value::Bool(b) => Some(*b),
                Value::String(s) => match s.to_lowercase().as_str() {
                    "true" => Some(true),
                    "false" => Some(false),
                    _ => None,
                },
                Value::Number(_) => as_f64.filter(|x| *x == 0.0 || *x == 1.0).map(|x| x == 1.0),
                _ => None,
            }
            .ok_or_else(incompatible)?;
            Column::Bool(fill_nulls(values, fill))
        }
        Column::Str(values) => {
            let fill = match fill {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), |x| {
                    if n.is_f64() {
                        format_float(x)
                    } else {
                        n.to_string()
                    }
                }),
                Value::Null => return Err(incompatible()),
                other => other.to_string(),
            };
            Column::Str(fill_nulls(values, fill))
        }
        Column::DateTime(values) => {
            let fill = fill
                .as_str()
                .and_then(parse_datetime)
                .ok_or_else(incompatible)?;
            Column::DateTime(fill_nulls(values, fill))
        }
    })
}

pub fn trim_whitespace(table: &mut Table, cols: &[String]) -> Result<ExecutionLogEntry, StepError> {
    let found = existing(table, cols);
    for col in &found {
        let trimmed = require(table, col)?
            .to_strings()
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect();
        table.set_column(col.as_str(), Column::Str(trimmed))?;
    }
    Ok(ExecutionLogEntry::ok("trim_whitespace").with("cols", found))
}

pub fn parse_dates(table: &mut Table, col: &str) -> Result<ExecutionLogEntry, StepError> {
    if !table.contains(col) {
        return Ok(column_not_found("parse_dates", col));
    }
    let parsed = require(table, col)?.to_datetimes();
    table.set_column(col, Column::DateTime(parsed))?;
    Ok(ExecutionLogEntry::ok("parse_dates").with("col", col))
}

/// Rescale nullable values
pub fn scale_values(values: &[Option<f64>], method: ScaleMethod) -> Vec<Option<f64>> {
    let present = non_null(values);
    match method {
        ScaleMethod::MinMax => match min_max(&present) {
            Some((lo, hi)) if hi - lo != 0.0 => values
                .iter()
                .map(|v| Some(v.map_or(0.0, |x| (x - lo) / (hi - lo))))
                .collect(),
            _ => vec![Some(0.0); values.len()],
        },
        ScaleMethod::ZScore => match (mean(&present), population_std(&present)) {
            (Some(mu), Some(sd)) if sd != 0.0 => values
                .iter()
                .map(|v| Some(v.map_or(0.0, |x| (x - mu) / sd)))
                .collect(),
            _ => vec![Some(0.0); values.len()],
        },
        ScaleMethod::Log1p => {
            let shift = match min_max(&present) {
                Some((lo, _)) if lo < 0.0 => 1.0 - lo,
                _ => 0.0,
            };
            values
                .iter()
                .map(|v| v.map(|x| (x + shift).ln_1p()).filter(|y| !y.is_nan()))
                .collect()
        }
    }
}

pub fn scale(
    table: &mut Table,
    cols: &[String],
    method: &str,
    inplace: bool,
    suffix: &str,
) -> Result<ExecutionLogEntry, StepError> {
    let found = existing(table, cols);
    let kind = ScaleMethod::parse(method);
    let mut new_cols = Vec::with_capacity(found.len());

    for col in &found {
        let scaled = scale_values(&require(table, col)?.to_numeric(), kind);
        let target = if inplace {
            col.clone()
        } else {
            format!("{}{}", col, suffix)
        };
        table.set_column(target.as_str(), Column::float(scaled))?;
        new_cols.push(target);
    }

    Ok(ExecutionLogEntry::ok("scale")
        .with("cols", found)
        .with("method", method)
        .with("inplace", inplace)
        .with("new_cols", new_cols))
}

/// Lower and upper outlier bounds
pub fn outlier_bounds(values: &[f64], iqr: bool, k: f64) -> Option<(f64, f64)> {
    if iqr {
        let q1 = percentile(values, 25.0)?;
        let q3 = percentile(values, 75.0)?;
        let spread = q3 - q1;
        Some((q1 - k * spread, q3 + k * spread))
    } else {
        let mu = mean(values)?;
        let sd = population_std(values)?;
        Some((mu - k * sd, mu + k * sd))
    }
}

pub fn outliers(
    table: &mut Table,
    cols: &[String],
    method: &str,
    threshold: Option<f64>,
    action: &str,
    suffix: &str,
) -> Result<Vec<ExecutionLogEntry>, StepError> {
    let found = existing(table, cols);
    if found.is_empty() {
        return Ok(vec![ExecutionLogEntry::ok("outliers")
            .with("cols", Vec::<String>::new())
            .with("action", action)
            .with("num_outliers", 0)]);
    }

    let iqr = method.trim().eq_ignore_ascii_case("iqr");
    let k = threshold.unwrap_or(if iqr { 1.5 } else { 3.0 });
    if !k.is_finite() || k < 0.0 {
        return Err(StepError::InvalidParams {
            op: "outliers".to_string(),
            reason: format!("threshold must be a non-negative number, got {}", k),
        });
    }
    let mut entries = Vec::with_capacity(found.len());

    for col in &found {
        let column = require(table, col)?;
        if !column.is_numeric() {
            return Err(StepError::ColumnNotNumeric(col.clone()));
        }
        let values = column.to_numeric();
        let (lower, upper) = outlier_bounds(&non_null(&values), iqr, k)
            .ok_or_else(|| StepError::EmptyColumn(col.clone()))?;

        let mask: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| x < lower || x > upper))
            .collect();
        let num_outliers = mask.iter().filter(|&&m| m).count();

        match action {
            "cap" => {
                if num_outliers > 0 {
                    let capped = values
                        .iter()
                        .map(|v| v.map(|x| x.max(lower).min(upper)))
                        .collect();
                    table.set_column(col.as_str(), Column::float(capped))?;
                }
            }
            "remove" => {
                let keep: Vec<bool> = mask.iter().map(|m| !m).collect();
                table.retain_rows(&keep);
            }
            _ => {
                let flags = mask.into_iter().map(Some).collect();
                table.set_column(format!("{}{}", col, suffix), Column::Bool(flags))?;
            }
        }

        entries.push(
            ExecutionLogEntry::ok("outliers")
                .with("col", col.as_str())
                .with("action", action)
                .with("num_outliers", num_outliers)
                .with("lower", lower)
                .with("upper", upper),
        );
    }

    Ok(entries)
}

/// Step handler for the tabular vocabulary
#[derive(Debug, Default)]
pub struct TabularHandler;

impl StepHandler for TabularHandler {
    type State = Table;
    type Op = TabularOp;

    fn apply(
        &mut self,
        table: &mut Table,
        op: TabularOp,
        _spec: &OpSpec,
    ) -> Result<Vec<ExecutionLogEntry>, StepError> {
        match op {
            TabularOp::DropCols { cols } => Ok(vec![drop_cols(table, &cols)]),
            TabularOp::Cast { col, to } => cast(table, &col, &to).map(|e| vec![e]),
            TabularOp::Impute {
                col,
                strategy,
                value,
            } => impute(table, &col, &strategy, value.as_ref()).map(|e| vec![e]),
            TabularOp::TrimWhitespace { cols } => trim_whitespace(table, &cols).map(|e| vec![e]),
            TabularOp::ParseDates { col } => parse_dates(table, &col).map(|e| vec![e]),
            TabularOp::Scale {
                cols,
                method,
                inplace,
                suffix,
            } => scale(table, &cols, &method, inplace, &suffix).map(|e| vec![e]),
            TabularOp::Outliers {
                cols,
                method,
                threshold,
                action,
                suffix,
            } => outliers(table, &cols, &method, threshold, &action, &suffix),
        }
    }
}

/// Apply a tabular plan to a loaded table
pub fn apply_tabular_plan(table: Table, plan: &Plan) -> Execution<Table> {
    PlanExecutor::new(TabularHandler).run(plan, table)
}
