//! Image orchestrator

use super::codec::{decode_image, encode_png, load_image};
use super::handler::{DirectorySink, ImageHandler, PreviewHandler};
use super::profile::profile_image;
use super::raster::Raster;
use crate::config::ImageConfig;
use crate::executor::PlanExecutor;
use crate::planner::Planner;
use sdk::{ExecutionLogEntry, ImageProfile, PipelineError, Plan};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const DEFAULT_IMAGE_GOAL: &str = "prepare for ML";

/// Serializable result bundle of one image run
#[derive(Debug, Clone, Serialize)]
pub struct ImageBundle {
    pub profile: ImageProfile,
    pub plan: Plan,
    pub explanations: Vec<String>,
    pub execution_log: Vec<ExecutionLogEntry>,
    /// File name of the last written output, empty when nothing was written
    pub preprocessed_image: String,
}

#[derive(Debug, Clone)]
pub struct ImageRun {
    pub processed: ImageBundle,
    pub summary: String,
}

/// Profile, plan, explain and process one image; outputs go into `out_dir`
pub async fn run_visual_data_logic(
    path: &Path,
    goal: &str,
    planner: &Planner,
    config: &ImageConfig,
    out_dir: &Path,
) -> Result<ImageRun, PipelineError> {
    let (raster, file_size) = load_image(path)?;
    let profile = profile_image(&raster, file_size);
    let plan = planner.plan_image(&profile, goal).await;

    let mut explanations = Vec::with_capacity(plan.len());
    for step in &plan.ops {
        explanations.push(planner.explain_step(step, &profile, goal).await);
    }

    Ok(execute(raster, profile, plan, explanations, config, out_dir))
}

/// Execute a caller-supplied plan against one image, without explanations
pub fn run_image_plan(
    path: &Path,
    plan: Plan,
    config: &ImageConfig,
    out_dir: &Path,
) -> Result<ImageRun, PipelineError> {
    let (raster, file_size) = load_image(path)?;
    let profile = profile_image(&raster, file_size);
    Ok(execute(raster, profile, plan, Vec::new(), config, out_dir))
}

fn execute(
    raster: Raster,
    profile: ImageProfile,
    plan: Plan,
    explanations: Vec<String>,
    config: &ImageConfig,
    out_dir: &Path,
) -> ImageRun {
    info!("Applying image plan with {} ops into {}", plan.len(), out_dir.display());
    let handler = ImageHandler::new(
        DirectorySink::new(out_dir),
        config.augment_seed,
        config.max_variants,
    );
    let mut executor = PlanExecutor::new(handler);
    let execution = executor.run(&plan, raster);
    let final_file = executor
        .handler()
        .last_output()
        .unwrap_or_default()
        .to_string();

    let summary = format!(
        "Applied {} ops; final image = {}",
        execution.log.len(),
        final_file
    );

    ImageRun {
        processed: ImageBundle {
            profile,
            plan,
            explanations,
            execution_log: execution.log,
            preprocessed_image: final_file,
        },
        summary,
    }
}

/// Apply a plan in memory and return the result as PNG bytes
pub fn process_for_preview(bytes: &[u8], plan: &Plan) -> Result<Vec<u8>, PipelineError> {
    let raster = decode_image(bytes)?;
    let mut executor = PlanExecutor::new(PreviewHandler);
    let execution = executor.run(plan, raster);
    encode_png(&execution.artifact).map_err(|e| PipelineError::Output(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raster::Depth;
    use sdk::{OpSpec, StepStatus};

    fn png_bytes() -> Vec<u8> {
        let raster = Raster::from_fn(20, 10, Depth::U8, |x, y, c| ((x * 9 + y * 4 + c) % 256) as f32);
        encode_png(&raster).unwrap()
    }

    #[test]
    fn test_run_image_plan_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, png_bytes()).unwrap();

        let plan = Plan::new(
            vec![
                OpSpec::new("resize").with("width", 8).with("height", 8),
                OpSpec::new("sharpen"),
                OpSpec::new("normalize").with("method", "zscore"),
            ],
            "",
        );
        let out = dir.path().join("out");
        let run = run_image_plan(&input, plan, &ImageConfig::default(), &out).unwrap();

        let log = &run.processed.execution_log;
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].status, StepStatus::Skip);
        assert!(run.processed.preprocessed_image.ends_with("_normalize_zscore.npy"));
        assert!(out.join(&run.processed.preprocessed_image).exists());
        assert_eq!(
            run.summary,
            format!("Applied 3 ops; final image = {}", run.processed.preprocessed_image)
        );
        assert_eq!(run.processed.profile.width, 20);
    }

    #[test]
    fn test_preview_returns_png() {
        let plan = Plan::new(
            vec![
                OpSpec::new("resize").with("width", 5).with("height", 4),
                OpSpec::new("normalize").with("method", "zscore"),
            ],
            "",
        );
        let png = process_for_preview(&png_bytes(), &plan).unwrap();
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 4));
    }

    #[test]
    fn test_preview_of_garbage_is_input_error() {
        assert!(matches!(
            process_for_preview(b"nope", &Plan::default()),
            Err(PipelineError::Input(_))
        ));
    }
}
