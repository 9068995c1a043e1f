//! Integration tests for configuration loading.
//!
//! These tests cover the full configuration stack: defaults, TOML file
//! parsing, environment variable overrides, CLI flag overrides, and the
//! fallback for broken files.

use clap::Parser;
use drivedupe::cli::{Cli, Commands, OutputFormat};
use drivedupe::commands::resolve_request;
use drivedupe::config::Config;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;

// =============================================================================
// Helper Functions
// =============================================================================

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DRIVEDUPE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DRIVEDUPE_") {
            std::env::remove_var(key);
        }
    }
}

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    (temp_dir, path)
}

// =============================================================================
// Basic Configuration Tests
// =============================================================================

#[test]
fn test_config_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let config = Config::load_from_path(temp_dir.path().join("nonexistent.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config(
        r#"
token_path = "/secrets/token.json"
page_size = 250
request_timeout_secs = 10
keep_strategy = "newest"
trash_folder_id = "F9"
output = "json"
"#,
    );

    let config = Config::load_from_path(&path);

    assert_eq!(config.token_path, Some(PathBuf::from("/secrets/token.json")));
    assert_eq!(config.page_size, 250);
    assert_eq!(config.request_timeout_secs, 10);
    assert_eq!(config.keep_strategy.as_deref(), Some("newest"));
    assert_eq!(config.trash_folder_id.as_deref(), Some("F9"));
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_config_invalid_file_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("page_size = \"lots\"\n");

    let config = Config::load_from_path(&path);
    assert_eq!(config.page_size, Config::default().page_size);
}

#[test]
fn test_config_unknown_keys_are_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("keep_stratgy = \"oldest\"\npage_size = 10\n");

    let config = Config::load_from_path(&path);
    assert_eq!(config.page_size, 10);
    assert!(config.keep_strategy.is_none());
}

// =============================================================================
// Override Hierarchy Tests
// =============================================================================

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("page_size = 250\noutput = \"csv\"\n");

    std::env::set_var("DRIVEDUPE_PAGE_SIZE", "500");
    std::env::set_var("DRIVEDUPE_ACCESS_TOKEN", "ya29.token");
    let config = Config::load_from_path(&path);
    clear_env();

    assert_eq!(config.page_size, 500);
    assert_eq!(config.output, OutputFormat::Csv);
    assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
}

#[test]
fn test_env_survives_invalid_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("this is not toml");

    std::env::set_var("DRIVEDUPE_KEEP_STRATEGY", "largest");
    let config = Config::load_from_path(&path);
    clear_env();

    assert_eq!(config.keep_strategy.as_deref(), Some("largest"));
}

#[test]
fn test_cli_token_overrides_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("token_path = \"/from/config.json\"\n");

    let cli = Cli::try_parse_from(["drivedupe", "--token", "/from/cli.json", "scan"]).unwrap();
    let mut config = Config::load_from_path(&path);
    config.merge_cli(&cli);

    assert_eq!(config.token_file(), Some(PathBuf::from("/from/cli.json")));
}

#[test]
fn test_cli_rules_override_config_rules() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("keep_strategy = \"oldest\"\ntrash_folder_id = \"F1\"\n");
    let config = Config::load_from_path(&path);

    let cli = Cli::try_parse_from(["drivedupe", "scan", "--keep-strategy", "smallest"]).unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("Expected Scan command");
    };
    let request = resolve_request(&args, &config);

    assert_eq!(request.keep_strategy.as_deref(), Some("smallest"));
    assert_eq!(request.trash_folder_id.as_deref(), Some("F1"));
}

#[test]
fn test_client_config_from_settings() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) =
        write_config("api_base_url = \"http://127.0.0.1:9000/drive/v3/\"\npage_size = 0\n");

    let client = Config::load_from_path(&path).client_config();
    assert_eq!(client.base_url, "http://127.0.0.1:9000/drive/v3");
    assert_eq!(client.page_size, 1);
}
