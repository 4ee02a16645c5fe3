// Tidyflow data-cleaning pipeline
// Main entry point for the tidyflow binary

use clap::Parser;
use tidyflow_engine::cli::{Cli, Command, ConfigAction, SecretAction};
use tidyflow_engine::config::Config;
use tidyflow_engine::handlers::{
    handle_apply, handle_config_path, handle_config_show, handle_image, handle_plan,
    handle_preview, handle_secret_delete, handle_secret_set, handle_secret_status, handle_tabular,
    handle_text, OutputFormat,
};
use tidyflow_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the configured level; RUST_LOG beats both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::debug!(
        "Tidyflow v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Tabular { path, goal, out } => {
            handle_tabular(&path, goal.as_deref(), out.as_deref(), &config, format).await
        }

        Command::Text { path, goal, out } => {
            handle_text(&path, goal.as_deref(), out.as_deref(), &config, format).await
        }

        Command::Image { path, goal, out } => {
            handle_image(&path, goal.as_deref(), out, &config, format).await
        }

        Command::Plan {
            modality,
            path,
            goal,
        } => handle_plan(modality.into(), &path, goal.as_deref(), &config, format).await,

        Command::Apply {
            modality,
            path,
            plan,
            out,
        } => handle_apply(modality.into(), &path, &plan, out, &config, format),

        Command::Preview { image, plan, out } => handle_preview(&image, &plan, &out, format),

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
        },

        Command::Secret { action } => match action {
            SecretAction::Set { value } => handle_secret_set(value, format),
            SecretAction::Delete => handle_secret_delete(format),
            SecretAction::Status => handle_secret_status(&config, format),
        },
    }
}
