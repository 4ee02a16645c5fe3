/// Example running the tabular pipeline with the offline planner
///
/// This example shows how to:
/// 1. Write a small CSV with missing values
/// 2. Profile, plan and clean it without any LLM provider
/// 3. Inspect the plan, the execution log and the cleaned preview
///
/// Run with: cargo run --example offline_plan
use tidyflow_engine::config::TabularConfig;
use tidyflow_engine::planner::Planner;
use tidyflow_engine::tabular::run_structured_data_logic;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Offline Tabular Cleaning Example ===\n");

    // 1. Input with two missing ages
    let dir = std::env::temp_dir().join("tidyflow-example");
    std::fs::create_dir_all(&dir)?;
    let input = dir.join("people.csv");
    std::fs::write(
        &input,
        "name,age,city\nAda,36,London\nLinus,,Helsinki\nGrace,45,NYC\nKen,,Berkeley\n",
    )?;
    println!("1. Wrote {}\n", input.display());

    // 2. Full run; no provider means the fallback plan
    let output = dir.join("people_clean.csv");
    let run = run_structured_data_logic(
        &input,
        "prepare for ML",
        &Planner::offline(),
        &TabularConfig::default(),
        Some(&output),
    )
    .await?;

    // 3. What happened
    println!("2. Plan: {}", run.processed.plan.notes);
    for op in &run.processed.plan.ops {
        println!("   {}", op.to_value());
    }
    println!("\n3. Execution log:");
    for entry in &run.processed.execution_log {
        println!("   {}", serde_json::to_string(entry)?);
    }
    println!("\n{}", run.summary);
    println!("Cleaned CSV: {}", output.display());
    println!(
        "Preview: {}",
        serde_json::to_string_pretty(&run.processed.cleaned_preview)?
    );

    Ok(())
}
