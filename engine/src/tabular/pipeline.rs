//! Tabular orchestrator

use super::csv_io::{read_csv, write_csv};
use super::ops::apply_tabular_plan;
use super::profile::profile_table;
use super::table::{Table, TablePreview};
use crate::config::TabularConfig;
use crate::planner::Planner;
use sdk::{ExecutionLogEntry, PipelineError, Plan, TabularProfile};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const DEFAULT_TABULAR_GOAL: &str = "prepare for ML";

/// Serializable result bundle of one tabular run
#[derive(Debug, Clone, Serialize)]
pub struct TabularBundle {
    pub cleaned_preview: TablePreview,
    pub plan: Plan,
    pub execution_log: Vec<ExecutionLogEntry>,
}

#[derive(Debug, Clone)]
pub struct TabularRun {
    pub processed: TabularBundle,
    pub summary: String,
    pub profile: TabularProfile,
    pub table: Table,
}

/// Profile, plan and clean one CSV file, optionally writing the result
pub async fn run_structured_data_logic(
    path: &Path,
    goal: &str,
    planner: &Planner,
    config: &TabularConfig,
    out_path: Option<&Path>,
) -> Result<TabularRun, PipelineError> {
    let table = read_csv(path)?;
    let profile = profile_table(&table, config.sample_rows);
    let plan = planner.plan_tabular(&profile, goal).await;
    execute(table, profile, plan, config, out_path)
}

/// Execute a caller-supplied plan against one CSV file
pub fn run_tabular_plan(
    path: &Path,
    plan: Plan,
    config: &TabularConfig,
    out_path: Option<&Path>,
) -> Result<TabularRun, PipelineError> {
    let table = read_csv(path)?;
    let profile = profile_table(&table, config.sample_rows);
    execute(table, profile, plan, config, out_path)
}

fn execute(
    table: Table,
    profile: TabularProfile,
    plan: Plan,
    config: &TabularConfig,
    out_path: Option<&Path>,
) -> Result<TabularRun, PipelineError> {
    info!("Applying tabular plan with {} ops", plan.len());
    let execution = apply_tabular_plan(table, &plan);
    let table = execution.artifact;

    if let Some(out) = out_path {
        write_csv(&table, out)?;
        info!("Wrote cleaned table to {}", out.display());
    }

    let summary = format!(
        "Applied {} ops. Rows:{}. Cols:{}.",
        plan.len(),
        table.height(),
        table.width()
    );

    Ok(TabularRun {
        processed: TabularBundle {
            cleaned_preview: table.preview(config.preview_rows),
            plan,
            execution_log: execution.log,
        },
        summary,
        profile,
        table,
    })
}
