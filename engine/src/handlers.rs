//! Command handlers for CLI operations
//!
//! Each handler runs one pipeline entry point and prints its result as text
//! or JSON. Pipeline errors are surfaced through `anyhow` with context.

use anyhow::{Context, Result};
use sdk::{ExecutionLogEntry, Modality, Plan, StepStatus};
use serde_json::json;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::image::{
    load_image, process_for_preview, profile_image, run_image_plan, run_visual_data_logic,
    ImageRun, DEFAULT_IMAGE_GOAL,
};
use crate::planner::{parse_plan, Planner};
use crate::secrets::{resolve_api_key, SecretManager, SecretString, GEMINI_KEY, SERVICE_NAME};
use crate::tabular::{
    profile_table, read_csv, run_structured_data_logic, run_tabular_plan, TabularRun,
    DEFAULT_TABULAR_GOAL,
};
use crate::text::{
    load_document, profile_text, run_text_data_logic, run_text_plan, TextRun, DEFAULT_TEXT_GOAL,
};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Planner for this invocation, with the credential resolved at the edge
pub fn build_planner(config: &Config) -> Planner {
    let api_key = match config.planner.provider.as_str() {
        "gemini" => resolve_api_key(&config.planner.api_key_env),
        _ => None,
    };
    let planner = Planner::from_config(&config.planner, api_key);
    match planner.provider_name() {
        Some(name) => tracing::info!("Planner provider: {}", name),
        None => tracing::info!("Planner offline; fallback plans only"),
    }
    planner
}

/// Read a plan file (`{"ops": [...], "notes": "..."}`)
pub fn load_plan_file(path: &Path) -> Result<Plan> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    parse_plan(&text).with_context(|| format!("Invalid plan file {}", path.display()))
}

fn default_goal(modality: Modality) -> &'static str {
    match modality {
        Modality::Tabular => DEFAULT_TABULAR_GOAL,
        Modality::Text => DEFAULT_TEXT_GOAL,
        Modality::Image => DEFAULT_IMAGE_GOAL,
    }
}

/// One-line rendering of a log entry for text output
pub fn format_log_entry(entry: &ExecutionLogEntry) -> String {
    let marker = match entry.status {
        StepStatus::Ok => "✓",
        StepStatus::Skip => "-",
        StepStatus::Error => "✗",
    };
    if entry.details.is_empty() {
        format!("{} {}", marker, entry.op)
    } else {
        let details: Vec<String> = entry
            .details
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect();
        format!("{} {} ({})", marker, entry.op, details.join(", "))
    }
}

fn print_plan(plan: &Plan) {
    println!("Plan ({} ops):", plan.len());
    for (i, op) in plan.ops.iter().enumerate() {
        println!("  {}. {}", i + 1, op.to_value());
    }
    if !plan.notes.is_empty() {
        println!("Notes: {}", plan.notes);
    }
    if let Some(reasoning) = &plan.reasoning {
        println!("Reasoning: {}", reasoning);
    }
}

fn print_log(log: &[ExecutionLogEntry]) {
    println!("Execution log:");
    for entry in log {
        println!("  {}", format_log_entry(entry));
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_tabular(run: &TabularRun, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_plan(&run.processed.plan);
            println!();
            print_log(&run.processed.execution_log);
            println!();
            println!("{}", run.summary);
            if let Some(out) = out {
                println!("Cleaned CSV written to {}", out.display());
            }
        }
        OutputFormat::Json => print_json(&json!({
            "processed": run.processed,
            "summary": run.summary,
        }))?,
    }
    Ok(())
}

fn report_text(run: &TextRun, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    if let Some(out) = out {
        std::fs::write(out, &run.cleaned)
            .with_context(|| format!("Failed to write {}", out.display()))?;
    }
    match format {
        OutputFormat::Text => {
            print_plan(&run.processed.plan);
            println!();
            print_log(&run.processed.execution_log);
            println!();
            println!("Preview: {}", run.processed.cleaned_preview);
            println!("{}", run.summary);
            if let Some(out) = out {
                println!("Cleaned text written to {}", out.display());
            }
        }
        OutputFormat::Json => print_json(&json!({
            "processed": run.processed,
            "summary": run.summary,
        }))?,
    }
    Ok(())
}

fn report_image(run: &ImageRun, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let bundle = &run.processed;
            println!("Plan ({} ops):", bundle.plan.len());
            for (i, op) in bundle.plan.ops.iter().enumerate() {
                println!("  {}. {}", i + 1, op.to_value());
                if let Some(explanation) = bundle.explanations.get(i) {
                    println!("     {}", explanation);
                }
            }
            if !bundle.plan.notes.is_empty() {
                println!("Notes: {}", bundle.plan.notes);
            }
            println!();
            print_log(&bundle.execution_log);
            println!();
            println!("{}", run.summary);
        }
        OutputFormat::Json => print_json(&json!({
            "processed": run.processed,
            "summary": run.summary,
        }))?,
    }
    Ok(())
}

fn image_out_dir(out: Option<PathBuf>, config: &Config) -> PathBuf {
    out.unwrap_or_else(|| config.core.output_dir.clone())
}

/// Full tabular run
pub async fn handle_tabular(
    path: &Path,
    goal: Option<&str>,
    out: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let planner = build_planner(config);
    let goal = goal.unwrap_or(DEFAULT_TABULAR_GOAL);
    let run = run_structured_data_logic(path, goal, &planner, &config.tabular, out)
        .await
        .with_context(|| format!("Tabular run failed for {}", path.display()))?;
    report_tabular(&run, out, format)
}

/// Full text run
pub async fn handle_text(
    path: &Path,
    goal: Option<&str>,
    out: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let planner = build_planner(config);
    let goal = goal.unwrap_or(DEFAULT_TEXT_GOAL);
    let run = run_text_data_logic(path, goal, &planner, &config.text)
        .await
        .with_context(|| format!("Text run failed for {}", path.display()))?;
    report_text(&run, out, format)
}

/// Full image run
pub async fn handle_image(
    path: &Path,
    goal: Option<&str>,
    out: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let planner = build_planner(config);
    let goal = goal.unwrap_or(DEFAULT_IMAGE_GOAL);
    let out_dir = image_out_dir(out, config);
    let run = run_visual_data_logic(path, goal, &planner, &config.image, &out_dir)
        .await
        .with_context(|| format!("Image run failed for {}", path.display()))?;
    report_image(&run, format)
}

/// Profile a file and print the plan the planner proposes for it
pub async fn handle_plan(
    modality: Modality,
    path: &Path,
    goal: Option<&str>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let planner = build_planner(config);
    let goal = goal.unwrap_or(default_goal(modality));

    let (profile, plan) = match modality {
        Modality::Tabular => {
            let table = read_csv(path)?;
            let profile = profile_table(&table, config.tabular.sample_rows);
            let plan = planner.plan_tabular(&profile, goal).await;
            (serde_json::to_value(&profile)?, plan)
        }
        Modality::Text => {
            let doc = load_document(path)?;
            let profile = profile_text(&doc);
            let plan = planner.plan_text(&profile, goal).await;
            (serde_json::to_value(&profile)?, plan)
        }
        Modality::Image => {
            let (raster, file_size) = load_image(path)?;
            let profile = profile_image(&raster, file_size);
            let plan = planner.plan_image(&profile, goal).await;
            (serde_json::to_value(&profile)?, plan)
        }
    };

    match format {
        OutputFormat::Text => {
            println!("Profile:");
            println!("{}", serde_json::to_string_pretty(&profile)?);
            println!();
            print_plan(&plan);
        }
        OutputFormat::Json => print_json(&json!({ "profile": profile, "plan": plan }))?,
    }
    Ok(())
}

/// Apply a plan file without consulting the planner
pub fn handle_apply(
    modality: Modality,
    path: &Path,
    plan_path: &Path,
    out: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan_file(plan_path)?;
    tracing::info!("Applying {} ops from {}", plan.len(), plan_path.display());

    match modality {
        Modality::Tabular => {
            let run = run_tabular_plan(path, plan, &config.tabular, out.as_deref())?;
            report_tabular(&run, out.as_deref(), format)
        }
        Modality::Text => {
            let run = run_text_plan(path, plan, &config.text)?;
            report_text(&run, out.as_deref(), format)
        }
        Modality::Image => {
            let out_dir = image_out_dir(out, config);
            let run = run_image_plan(path, plan, &config.image, &out_dir)?;
            report_image(&run, format)
        }
    }
}

/// Lenient in-memory image preview written as PNG
pub fn handle_preview(image: &Path, plan_path: &Path, out: &Path, format: OutputFormat) -> Result<()> {
    let plan = load_plan_file(plan_path)?;
    let bytes =
        std::fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    let png = process_for_preview(&bytes, &plan)?;
    std::fs::write(out, &png).with_context(|| format!("Failed to write {}", out.display()))?;

    match format {
        OutputFormat::Text => println!("Preview written to {} ({} bytes)", out.display(), png.len()),
        OutputFormat::Json => print_json(&json!({
            "preview": out.display().to_string(),
            "bytes": png.len(),
        }))?,
    }
    Ok(())
}

pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
        OutputFormat::Json => print_json(&serde_json::to_value(config)?)?,
    }
    Ok(())
}

pub fn handle_config_path(custom: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match custom {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path()?,
    };
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => print_json(&json!({ "path": path.display().to_string() }))?,
    }
    Ok(())
}

/// Key from `--value`, otherwise the first line of `input`
pub fn read_secret_value(value: Option<String>, mut input: impl BufRead) -> Result<SecretString> {
    let raw = match value {
        Some(v) => v,
        None => {
            let mut line = String::new();
            input
                .read_line(&mut line)
                .context("Failed to read API key from stdin")?;
            line
        }
    };
    let key = SecretString::new(raw.trim());
    if key.is_empty() {
        anyhow::bail!("No API key given");
    }
    Ok(key)
}

pub fn handle_secret_set(value: Option<String>, format: OutputFormat) -> Result<()> {
    if value.is_none() && format == OutputFormat::Text {
        eprintln!("Enter Gemini API key:");
    }
    let key = read_secret_value(value, std::io::stdin().lock())?;
    SecretManager::new(SERVICE_NAME).set_secret(GEMINI_KEY, key.unsecure())?;

    match format {
        OutputFormat::Text => println!("✓ Gemini API key stored in the OS keychain"),
        OutputFormat::Json => print_json(&json!({ "stored": GEMINI_KEY }))?,
    }
    Ok(())
}

pub fn handle_secret_delete(format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(SERVICE_NAME);
    if !manager.has_secret(GEMINI_KEY) {
        anyhow::bail!("No Gemini API key stored in the OS keychain");
    }
    manager.delete_secret(GEMINI_KEY)?;

    match format {
        OutputFormat::Text => println!("✓ Gemini API key removed from the OS keychain"),
        OutputFormat::Json => print_json(&json!({ "deleted": GEMINI_KEY }))?,
    }
    Ok(())
}

/// Which credential sources currently hold a key
pub fn handle_secret_status(config: &Config, format: OutputFormat) -> Result<()> {
    let env_var = &config.planner.api_key_env;
    let in_env = std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty());
    let in_keychain = SecretManager::new(SERVICE_NAME).has_secret(GEMINI_KEY);

    match format {
        OutputFormat::Text => {
            println!("${}: {}", env_var, if in_env { "set" } else { "not set" });
            println!("keychain: {}", if in_keychain { "stored" } else { "none" });
        }
        OutputFormat::Json => print_json(&json!({
            "env_var": env_var,
            "env": in_env,
            "keychain": in_keychain,
        }))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_log_entry() {
        let entry = ExecutionLogEntry::ok("impute")
            .with("col", "age")
            .with("filled", 2);
        assert_eq!(format_log_entry(&entry), "✓ impute (col=age, filled=2)");

        let skipped = ExecutionLogEntry::skip("sharpen", "unknown op");
        assert_eq!(format_log_entry(&skipped), "- sharpen (reason=unknown op)");
    }

    #[test]
    fn test_load_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"ops":[{"op":"lowercase"}],"notes":"mine"}"#).unwrap();

        let plan = load_plan_file(&path).unwrap();
        assert_eq!(plan.ops[0].name(), "lowercase");
        assert_eq!(plan.notes, "mine");

        std::fs::write(&path, "not a plan").unwrap();
        assert!(load_plan_file(&path).is_err());
        assert!(load_plan_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_apply_tabular_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("in.csv");
        std::fs::write(&csv, "a,b\n1,x\n,y\n3,z\n").unwrap();
        let plan = dir.path().join("plan.json");
        std::fs::write(
            &plan,
            r#"{"ops":[{"op":"impute","col":"a","strategy":"median"},{"op":"drop_cols","cols":["b"]}]}"#,
        )
        .unwrap();
        let out = dir.path().join("out.csv");

        handle_apply(
            Modality::Tabular,
            &csv,
            &plan,
            Some(out.clone()),
            &Config::default(),
            OutputFormat::Json,
        )
        .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("a\n"));
        assert!(!written.contains('b'));
    }

    #[test]
    fn test_read_secret_value() {
        let key = read_secret_value(None, std::io::Cursor::new("  AIza-from-stdin \nrest")).unwrap();
        assert_eq!(key.unsecure(), "AIza-from-stdin");

        let key = read_secret_value(Some("AIza-flag".to_string()), std::io::Cursor::new("ignored")).unwrap();
        assert_eq!(key.unsecure(), "AIza-flag");

        assert!(read_secret_value(None, std::io::Cursor::new("\n")).is_err());
        assert!(read_secret_value(Some("   ".to_string()), std::io::Cursor::new("")).is_err());
    }
}
