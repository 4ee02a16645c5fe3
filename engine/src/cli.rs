//! CLI interface for Tidyflow
//!
//! Defines all commands and global flags using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use sdk::Modality;
use std::path::PathBuf;

/// Tidyflow data-cleaning pipeline
///
/// Profiles a CSV, text/PDF or image file, asks a planner for a cleaning plan
/// and applies it, recording every step in an execution log.
#[derive(Parser, Debug)]
#[command(name = "tidyflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Profile, plan and clean a CSV file
    Tabular {
        path: PathBuf,

        /// Cleaning goal handed to the planner
        #[arg(short, long)]
        goal: Option<String>,

        /// Where to write the cleaned CSV
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Profile, plan and clean a text or PDF file
    Text {
        path: PathBuf,

        #[arg(short, long)]
        goal: Option<String>,

        /// Where to write the cleaned text
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Profile, plan and preprocess an image
    Image {
        path: PathBuf,

        #[arg(short, long)]
        goal: Option<String>,

        /// Output directory for processed images (default: core.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Profile a file and print the plan without applying it
    Plan {
        #[arg(value_enum)]
        modality: ModalityArg,

        path: PathBuf,

        #[arg(short, long)]
        goal: Option<String>,
    },

    /// Apply a plan from a JSON file
    Apply {
        #[arg(value_enum)]
        modality: ModalityArg,

        path: PathBuf,

        /// Plan file ({"ops": [...], "notes": "..."})
        #[arg(long, value_name = "FILE")]
        plan: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a lenient in-memory preview of an image plan as PNG
    Preview {
        image: PathBuf,

        #[arg(long, value_name = "FILE")]
        plan: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the Gemini API key in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalityArg {
    Tabular,
    Text,
    Image,
}

impl From<ModalityArg> for Modality {
    fn from(arg: ModalityArg) -> Self {
        match arg {
            ModalityArg::Tabular => Modality::Tabular,
            ModalityArg::Text => Modality::Text,
            ModalityArg::Image => Modality::Image,
        }
    }
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Keychain actions for the planner credential
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store the key; read from stdin when `--value` is omitted
    Set {
        #[arg(long)]
        value: Option<String>,
    },

    /// Remove the stored key
    Delete,

    /// Report where the key would be resolved from
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["tidyflow", "tabular", "data.csv"]);
        if let Command::Tabular { path, goal, out } = cli.command {
            assert_eq!(path, PathBuf::from("data.csv"));
            assert!(goal.is_none());
            assert!(out.is_none());
        } else {
            panic!("Expected Tabular command");
        }
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["tidyflow", "--json", "--log", "debug", "config", "show"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_goal_and_out() {
        let cli = Cli::parse_from([
            "tidyflow",
            "image",
            "cat.jpg",
            "--goal",
            "train a classifier",
            "--out",
            "/tmp/out",
        ]);
        if let Command::Image { goal, out, .. } = cli.command {
            assert_eq!(goal.as_deref(), Some("train a classifier"));
            assert_eq!(out, Some(PathBuf::from("/tmp/out")));
        } else {
            panic!("Expected Image command");
        }
    }

    #[test]
    fn test_apply_command() {
        let cli = Cli::parse_from(["tidyflow", "apply", "text", "notes.pdf", "--plan", "plan.json"]);
        if let Command::Apply { modality, plan, .. } = cli.command {
            assert_eq!(Modality::from(modality), Modality::Text);
            assert_eq!(plan, PathBuf::from("plan.json"));
        } else {
            panic!("Expected Apply command");
        }
    }

    #[test]
    fn test_preview_requires_plan() {
        assert!(Cli::try_parse_from(["tidyflow", "preview", "a.png", "--out", "b.png"]).is_err());
        assert!(Cli::try_parse_from(["tidyflow", "plan", "audio", "a.wav"]).is_err());
    }

    #[test]
    fn test_secret_commands() {
        let cli = Cli::parse_from(["tidyflow", "secret", "set", "--value", "AIza-test"]);
        if let Command::Secret {
            action: SecretAction::Set { value },
        } = cli.command
        {
            assert_eq!(value.as_deref(), Some("AIza-test"));
        } else {
            panic!("Expected Secret set command");
        }

        let cli = Cli::parse_from(["tidyflow", "secret", "set"]);
        assert!(matches!(
            cli.command,
            Command::Secret {
                action: SecretAction::Set { value: None }
            }
        ));
        let cli = Cli::parse_from(["tidyflow", "secret", "delete"]);
        assert!(matches!(
            cli.command,
            Command::Secret {
                action: SecretAction::Delete
            }
        ));
    }
}
