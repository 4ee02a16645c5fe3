//! Fallback plans and canned step explanations
//!
//! Used whenever plan generation is unavailable or returns something that is
//! not a plan. Notes always end in "(AI unavailable)".

use sdk::{OpSpec, Plan, TabularProfile};
use serde_json::{json, Value};

/// Goal keywords that switch the image fallback to the training variant
const TRAINING_KEYWORDS: &[&str] = &["train", "dataset", "augment", "ml model", "variety"];

/// Column the tabular fallback imputes: the numeric column with the highest
/// null fraction, the first numeric column when none has nulls
pub fn designated_numeric_column(profile: &TabularProfile) -> Option<&str> {
    let mut numeric = profile.columns.iter().filter(|c| c.is_numeric());
    let first = numeric.next()?;
    let best = numeric.fold(first, |best, c| if c.null_pct > best.null_pct { c } else { best });
    Some(&best.name)
}

pub fn tabular_plan(profile: &TabularProfile) -> Plan {
    let mut ops = vec![OpSpec::new("drop_cols").with("cols", json!([]))];
    if let Some(col) = designated_numeric_column(profile) {
        ops.push(
            OpSpec::new("impute")
                .with("col", col)
                .with("strategy", "median"),
        );
    }
    Plan::new(ops, "Basic cleaning plan (AI unavailable)")
}

pub fn text_plan() -> Plan {
    Plan::new(
        vec![OpSpec::new("lowercase"), OpSpec::new("remove_punctuation")],
        "Basic text cleaning (AI unavailable)",
    )
}

pub fn wants_training(goal: &str) -> bool {
    let goal = goal.to_lowercase();
    TRAINING_KEYWORDS.iter().any(|k| goal.contains(k))
}

pub fn image_plan(goal: &str) -> Plan {
    let resize = OpSpec::new("resize").with("width", 224).with("height", 224);
    let normalize = OpSpec::new("normalize").with("method", "minmax");

    if wants_training(goal) {
        let augment = OpSpec::new("augment")
            .with("mode", "ml_training")
            .with("rotation_range", 15)
            .with("zoom_range", 0.1)
            .with("horizontal_flip", true)
            .with("num_variants", 6);
        Plan::new(
            vec![resize, augment, normalize],
            "ML training preprocessing (AI unavailable)",
        )
        .with_reasoning("AI unavailable; standard ML-training pipeline with 6 aug variants.")
    } else {
        Plan::new(vec![resize, normalize], "Basic image preprocessing (AI unavailable)")
            .with_reasoning("AI unavailable; basic 224x224 resize + minmax normalize.")
    }
}

fn param_or(step: &OpSpec, key: &str, default: Value) -> String {
    match step.param(key).cloned().unwrap_or(default) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Canned explanation of one image step
pub fn explain(step: &OpSpec) -> String {
    match step.name() {
        "resize" => format!(
            "Resize to {}x{} to standardize input size.",
            param_or(step, "width", json!(224)),
            param_or(step, "height", json!(224))
        ),
        "denoise" => format!(
            "Denoise ({}) reduces noise for cleaner input.",
            param_or(step, "method", json!("gaussian"))
        ),
        "normalize" => format!(
            "Normalize ({}) scales pixels for stable training.",
            param_or(step, "method", json!("minmax"))
        ),
        "augment" if step.param("mode").and_then(Value::as_str) == Some("ml_training") => format!(
            "ML augment: {} random variants (rot±{}°, zoom±{}) to boost model robustness.",
            param_or(step, "num_variants", json!(6)),
            param_or(step, "rotation_range", json!(0)),
            param_or(step, "zoom_range", json!(0))
        ),
        "augment" => {
            "Augment applies fixed transforms to preview results deterministically.".to_string()
        }
        other => format!("No explanation available for op: {}", other),
    }
}
