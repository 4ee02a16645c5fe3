//! Configuration management
//!
//! Loading, validation and defaults of the Tidyflow configuration, stored in
//! TOML format at `~/.tidyflow/config.toml`.
//!
//! # Configuration Sections
//!
//! - **core**: log level, output directory
//! - **planner**: provider selection, timeout, credential lookup, provider endpoints
//! - **tabular**: profiling sample size, preview rows
//! - **text**: preview length
//! - **image**: augmentation seed, variant cap
//!
//! Every field has a default, so a partial file (or an empty one) is valid.
//! Credentials are never stored here: the Gemini key is read from the
//! environment variable named by `planner.api_key_env`, then from the OS
//! keychain.
//!
//! # Examples
//!
//! ```no_run
//! use tidyflow_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Planner provider: {}", config.planner.provider);
//! println!("Outputs go to {:?}", config.core.output_dir);
//! # Ok(())
//! # }
//! ```

use sdk::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub tabular: TabularConfig,

    #[serde(default)]
    pub text: TextConfig,

    #[serde(default)]
    pub image: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where run outputs are written (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Planner adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// gemini, ollama or none
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Upper bound on one planner call; expiry substitutes the fallback plan
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the Gemini API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularConfig {
    /// Rows read by the profiler
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Rows in the cleaned preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Characters in the cleaned preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Fixed seed for `ml_training` augmentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augment_seed: Option<u64>,

    /// Upper bound on augmentation variants per step
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("cleaned_uploads")
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_sample_rows() -> usize {
    5000
}

fn default_preview_rows() -> usize {
    5
}

fn default_preview_chars() -> usize {
    500
}

fn default_max_variants() -> usize {
    20
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            sample_rows: default_sample_rows(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            augment_seed: None,
            max_variants: default_max_variants(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.tidyflow/config.toml`, writing the
    /// defaults there first if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the file cannot be read, written
    /// or parsed, or if validation fails.
    pub fn load_or_create() -> Result<Self, PipelineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;
        Ok(config)
    }

    fn create_default(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| PipelineError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)
            .map_err(|e| PipelineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// `~/.tidyflow/config.toml`
    pub fn default_config_path() -> Result<PathBuf, PipelineError> {
        let home = dirs::home_dir().ok_or_else(|| {
            PipelineError::Config("Could not determine home directory".to_string())
        })?;

        Ok(home.join(".tidyflow").join("config.toml"))
    }

    fn validate_and_process(&mut self) -> Result<(), PipelineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(PipelineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["gemini", "ollama", "none"];
        if !valid_providers.contains(&self.planner.provider.as_str()) {
            return Err(PipelineError::Config(format!(
                "Invalid planner provider '{}'. Must be one of: {}",
                self.planner.provider,
                valid_providers.join(", ")
            )));
        }

        if self.planner.timeout_secs == 0 {
            return Err(PipelineError::Config(
                "planner.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.planner.api_key_env.trim().is_empty() {
            return Err(PipelineError::Config(
                "planner.api_key_env must name an environment variable".to_string(),
            ));
        }

        if self.tabular.sample_rows == 0 {
            return Err(PipelineError::Config(
                "tabular.sample_rows must be greater than 0".to_string(),
            ));
        }

        if self.image.max_variants == 0 {
            return Err(PipelineError::Config(
                "image.max_variants must be at least 1".to_string(),
            ));
        }

        self.core.output_dir = expand_path(&self.core.output_dir)?;
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, PipelineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| PipelineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            PipelineError::Config("Could not determine home directory".to_string())
        })?;
        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| PipelineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
