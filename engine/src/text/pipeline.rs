//! Text orchestrator

use super::document::{load_document, TextDocument};
use super::ops::apply_text_plan;
use super::profile::profile_text;
use crate::config::TextConfig;
use crate::planner::Planner;
use sdk::{ExecutionLogEntry, PipelineError, Plan, TextProfile};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const DEFAULT_TEXT_GOAL: &str = "prepare for NLP";

/// Serializable result bundle of one text run
#[derive(Debug, Clone, Serialize)]
pub struct TextBundle {
    pub profile: TextProfile,
    pub plan: Plan,
    pub execution_log: Vec<ExecutionLogEntry>,
    pub cleaned_preview: String,
}

#[derive(Debug, Clone)]
pub struct TextRun {
    pub processed: TextBundle,
    pub summary: String,
    pub cleaned: String,
}

/// Profile, plan and clean one text or PDF file
pub async fn run_text_data_logic(
    path: &Path,
    goal: &str,
    planner: &Planner,
    config: &TextConfig,
) -> Result<TextRun, PipelineError> {
    let doc = load_document(path)?;
    let profile = profile_text(&doc);
    let plan = planner.plan_text(&profile, goal).await;
    Ok(execute(doc, profile, plan, config))
}

/// Execute a caller-supplied plan against one text or PDF file
pub fn run_text_plan(
    path: &Path,
    plan: Plan,
    config: &TextConfig,
) -> Result<TextRun, PipelineError> {
    let doc = load_document(path)?;
    let profile = profile_text(&doc);
    Ok(execute(doc, profile, plan, config))
}

fn execute(doc: TextDocument, profile: TextProfile, plan: Plan, config: &TextConfig) -> TextRun {
    info!("Applying text plan with {} ops", plan.len());
    let execution = apply_text_plan(&doc.text, &plan);
    let cleaned = execution.artifact.text;

    let summary = format!(
        "Applied {} ops; final length {} chars.",
        plan.len(),
        cleaned.chars().count()
    );

    TextRun {
        processed: TextBundle {
            profile,
            plan,
            execution_log: execution.log,
            cleaned_preview: cleaned.chars().take(config.preview_chars).collect(),
        },
        summary,
        cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::OpSpec;
    use std::io::Write;

    #[test]
    fn test_run_text_plan_summary_and_preview() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Header\nSome TEXT here.\nHeader").unwrap();

        let plan = Plan::new(
            vec![OpSpec::new("remove_boilerplate"), OpSpec::new("lowercase")],
            "",
        );
        let config = TextConfig { preview_chars: 4 };
        let run = run_text_plan(file.path(), plan, &config).unwrap();

        assert_eq!(run.cleaned, "some text here.");
        assert_eq!(run.processed.cleaned_preview, "some");
        assert_eq!(run.summary, "Applied 2 ops; final length 15 chars.");
        assert!((run.processed.profile.boilerplate_ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = run_text_plan(
            Path::new("/nonexistent/file.txt"),
            Plan::default(),
            &TextConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }
}
