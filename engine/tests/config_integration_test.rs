//! Integration tests for configuration management
//!
//! Config files are written to temporary directories; nothing touches
//! `~/.tidyflow`.

use std::io::Write;
use tidyflow_engine::config::Config;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
[core]
log_level = "debug"
output_dir = "/tmp/tidyflow-out"

[planner]
provider = "ollama"
timeout_secs = 10
api_key_env = "MY_GEMINI_KEY"

[planner.gemini]
base_url = "https://example.invalid/v1beta"
model = "gemini-test"

[planner.ollama]
base_url = "http://127.0.0.1:11434"
model = "qwen2.5:7b"

[tabular]
sample_rows = 100
preview_rows = 3

[text]
preview_chars = 80

[image]
augment_seed = 7
max_variants = 4
"#,
    );

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.planner.provider, "ollama");
    assert_eq!(config.planner.timeout_secs, 10);
    assert_eq!(config.planner.api_key_env, "MY_GEMINI_KEY");
    assert_eq!(config.planner.gemini.model, "gemini-test");
    assert_eq!(config.planner.ollama.model, "qwen2.5:7b");
    assert_eq!(config.tabular.sample_rows, 100);
    assert_eq!(config.tabular.preview_rows, 3);
    assert_eq!(config.text.preview_chars, 80);
    assert_eq!(config.image.augment_seed, Some(7));
    assert_eq!(config.image.max_variants, 4);
}

#[test]
fn test_partial_config_uses_defaults() {
    let file = write_config("[planner]\nprovider = \"none\"\n");

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.planner.provider, "none");
    assert_eq!(config.planner.timeout_secs, 30);
    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.tabular.sample_rows, 5000);
    assert_eq!(config.image.augment_seed, None);
    assert_eq!(config.image.max_variants, 20);
}

#[test]
fn test_empty_file_is_default_config() {
    let file = write_config("");
    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.planner.provider, "gemini");
    assert_eq!(config.planner.api_key_env, "GOOGLE_API_KEY");
}

#[test]
fn test_output_dir_tilde_expansion() {
    let file = write_config("[core]\noutput_dir = \"~/tidy-out\"\n");
    let config = Config::load_from_path(file.path()).unwrap();
    if let Some(home) = dirs::home_dir() {
        assert_eq!(config.core.output_dir, home.join("tidy-out"));
    }
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        ("[core]\nlog_level = \"loud\"\n", "log level"),
        ("[planner]\nprovider = \"openai\"\n", "provider"),
        ("[planner]\ntimeout_secs = 0\n", "timeout_secs"),
        ("[planner]\napi_key_env = \" \"\n", "api_key_env"),
        ("[tabular]\nsample_rows = 0\n", "sample_rows"),
        ("[image]\nmax_variants = 0\n", "max_variants"),
    ];

    for (contents, needle) in cases {
        let file = write_config(contents);
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(
            err.to_string().contains(needle),
            "error for {:?} should mention {}: {}",
            contents,
            needle,
            err
        );
    }
}

#[test]
fn test_malformed_toml() {
    let file = write_config("[core\nlog_level = ");
    assert!(Config::load_from_path(file.path()).is_err());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_from_path(&dir.path().join("nope.toml")).is_err());
}

#[test]
fn test_serialized_default_round_trips() {
    let toml_string = toml::to_string_pretty(&Config::default()).unwrap();
    let file = write_config(&toml_string);
    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.planner.gemini.model, "gemini-1.5-flash-latest");
    assert_eq!(config.planner.ollama.base_url, "http://localhost:11434");
}
