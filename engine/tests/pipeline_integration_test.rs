//! End-to-end tests for the three orchestrators
//!
//! All runs use the offline planner, so the fallback plans drive execution.

use sdk::{Plan, StepStatus};
use std::io::Write;
use tidyflow_engine::config::{ImageConfig, TabularConfig, TextConfig};
use tidyflow_engine::image::{
    encode_png, process_for_preview, run_visual_data_logic, Depth, Raster,
};
use tidyflow_engine::planner::Planner;
use tidyflow_engine::tabular::{column::Column, read_csv, run_structured_data_logic};
use tidyflow_engine::text::run_text_data_logic;

fn income_csv() -> String {
    let mut csv = String::from("id,income,city\n");
    let incomes = ["10.0", "", "20.0", "30.0", "40.0", "", "50.0", "60.0", "70.0", "80.0"];
    for (i, income) in incomes.iter().enumerate() {
        csv.push_str(&format!("{},{},town{}\n", i + 1, income, i % 3));
    }
    csv
}

fn gradient_png(width: usize, height: usize) -> Vec<u8> {
    let raster = Raster::from_fn(width, height, Depth::U8, |x, y, c| {
        ((x * 7 + y * 3 + c * 40) % 256) as f32
    });
    encode_png(&raster).unwrap()
}

#[tokio::test]
async fn test_tabular_fallback_imputes_median() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.csv");
    std::fs::write(&input, income_csv()).unwrap();
    let output = dir.path().join("people_clean.csv");

    let run = run_structured_data_logic(
        &input,
        "prepare for ML",
        &Planner::offline(),
        &TabularConfig::default(),
        Some(&output),
    )
    .await
    .unwrap();

    let income = run.profile.column("income").unwrap();
    assert!((income.null_pct - 0.2).abs() < 1e-9);

    let plan = &run.processed.plan;
    assert_eq!(plan.notes, "Basic cleaning plan (AI unavailable)");
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.ops[1].param("col").and_then(|v| v.as_str()), Some("income"));

    match run.table.column("income").unwrap() {
        Column::Float(values) => {
            assert!(values.iter().all(Option::is_some));
            assert_eq!(values[1], Some(45.0));
            assert_eq!(values[5], Some(45.0));
            assert_eq!(values[0], Some(10.0));
        }
        other => panic!("income should stay a float column, got {:?}", other),
    }

    assert_eq!(run.summary, "Applied 2 ops. Rows:10. Cols:3.");
    assert!(run
        .processed
        .execution_log
        .iter()
        .all(|e| e.status == StepStatus::Ok));

    let written = read_csv(&output).unwrap();
    assert_eq!(written.height(), 10);
    assert_eq!(written.column("income").unwrap().null_count(), 0);
}

#[tokio::test]
async fn test_tabular_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_structured_data_logic(
        &dir.path().join("missing.csv"),
        "x",
        &Planner::offline(),
        &TabularConfig::default(),
        None,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_text_fallback_lowercases_and_strips_punctuation() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(file, "Hello, World!\nSecond LINE; here.").unwrap();

    let run = run_text_data_logic(
        file.path(),
        "prepare for NLP",
        &Planner::offline(),
        &TextConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(run.processed.plan.notes, "Basic text cleaning (AI unavailable)");
    assert_eq!(run.processed.execution_log.len(), 2);
    assert!(run.cleaned.contains("hello"));
    assert!(!run.cleaned.chars().any(|c| c.is_ascii_punctuation()));
    assert!(!run.cleaned.chars().any(|c| c.is_uppercase()));
    assert_eq!(run.processed.profile.words, 5);
}

#[tokio::test]
async fn test_image_fallback_plan_with_explanations() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    std::fs::write(&input, gradient_png(40, 30)).unwrap();
    let out_dir = dir.path().join("processed");

    let run = run_visual_data_logic(
        &input,
        "prepare for ML",
        &Planner::offline(),
        &ImageConfig::default(),
        &out_dir,
    )
    .await
    .unwrap();

    let bundle = &run.processed;
    assert_eq!(bundle.profile.width, 40);
    assert_eq!(bundle.plan.len(), 2);
    assert_eq!(bundle.explanations.len(), 2);
    assert_eq!(bundle.explanations[0], "Resize to 224x224 to standardize input size.");
    assert!(bundle.preprocessed_image.ends_with("_normalize.png"));
    assert!(out_dir.join(&bundle.preprocessed_image).exists());

    let processed = image::open(out_dir.join(&bundle.preprocessed_image)).unwrap();
    assert_eq!((processed.width(), processed.height()), (224, 224));
}

#[tokio::test]
async fn test_image_training_goal_logs_each_variant() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    std::fs::write(&input, gradient_png(32, 32)).unwrap();
    let out_dir = dir.path().join("processed");
    let config = ImageConfig {
        augment_seed: Some(42),
        ..ImageConfig::default()
    };

    let run = run_visual_data_logic(
        &input,
        "build a training dataset",
        &Planner::offline(),
        &config,
        &out_dir,
    )
    .await
    .unwrap();

    let ops: Vec<&str> = run
        .processed
        .execution_log
        .iter()
        .map(|e| e.op.as_str())
        .collect();
    assert_eq!(ops.len(), 8);
    assert_eq!(ops[0], "resize");
    for (i, op) in ops[1..7].iter().enumerate() {
        assert_eq!(*op, format!("augment_ml_aug_{}", i + 1));
    }
    assert_eq!(ops[7], "normalize");

    let files = std::fs::read_dir(&out_dir).unwrap().count();
    assert_eq!(files, 8);
}

#[test]
fn test_preview_is_in_memory_png() {
    let plan: Plan = serde_json::from_str(
        r#"{"ops":[{"op":"resize"},{"op":"denoise","method":"median","ksize":4},{"op":"augment","h_flip":true}]}"#,
    )
    .unwrap();

    let png = process_for_preview(&gradient_png(50, 20), &plan).unwrap();
    let preview = image::load_from_memory(&png).unwrap();
    assert_eq!((preview.width(), preview.height()), (224, 224));

    assert!(process_for_preview(b"not an image", &plan).is_err());
}
