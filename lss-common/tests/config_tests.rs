//! Unit tests for bootstrap configuration resolution and graceful degradation
//!
//! Tests that manipulate LSS_CONFIG are marked with #[serial] so they do not
//! race each other on the process environment.

use lss_common::config::{load_toml_or_default, resolve_config_path, CONFIG_ENV_VAR};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    name: Option<String>,
}

fn default_port() -> u16 {
    8080
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            name: None,
        }
    }
}

#[test]
#[serial]
fn test_cli_argument_has_priority_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/lss-env-config.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/lss-cli-config.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/lss-cli-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/lss-env-config.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/lss-env-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config: SampleConfig = load_toml_or_default(Some(&missing)).unwrap();
    assert_eq!(config, SampleConfig::default());

    let config: SampleConfig = load_toml_or_default(None).unwrap();
    assert_eq!(config.port, 8080);
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "name = \"front-yard\"\n").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.name.as_deref(), Some("front-yard"));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    let result: lss_common::Result<SampleConfig> = load_toml_or_default(Some(&path));
    assert!(result.is_err());
}
