// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use serial_test::serial;
use vturn_config::{
    ConfigError, MultiSourceConfig, load_config, merge_fields, parse_extra_conf_file,
};

#[derive(Parser, Debug, PartialEq, Serialize, Deserialize)]
struct Config {
    /// Switch radix
    #[arg(long)]
    port_count: Option<usize>,

    /// Recovery policy name
    #[arg(long)]
    policy: Option<String>,

    /// Number of flows
    #[arg(long)]
    num_flows: Option<u64>,

    /// Path to additional configuration file
    #[arg(long)]
    #[serde(skip)]
    conf_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_count: Some(8),
            policy: Some("local-v-turn".to_string()),
            num_flows: Some(16),
            conf_file: None,
        }
    }
}

impl MultiSourceConfig for Config {
    fn conf_file(&self) -> Option<&Path> {
        self.conf_file.as_deref()
    }

    fn merge_from(&mut self, other: Self) {
        merge_fields!(self, other ; port_count, policy, num_flows, conf_file);
    }
}

fn clear_env() {
    // SAFETY: the tests that touch the environment are run serially.
    unsafe {
        std::env::remove_var("VTURN_PORT_COUNT");
        std::env::remove_var("VTURN_NUM_FLOWS");
    }
}

#[test]
#[serial]
fn defaults_only() {
    clear_env();
    let cli = Config::parse_from(["test"]);
    let config = load_config(cli).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn command_line_wins() {
    clear_env();
    let cli = Config::parse_from(["test", "--port-count", "4", "--policy", "backtrack-only"]);
    let config = load_config(cli).unwrap();
    assert_eq!(config.port_count, Some(4));
    assert_eq!(config.policy.as_deref(), Some("backtrack-only"));
    assert_eq!(config.num_flows, Some(16));
}

#[test]
#[serial]
fn file_then_env_then_command_line() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let conf_path = dir.path().join("run.toml");
    fs::write(&conf_path, "port_count = 6\nnum_flows = 3\npolicy = \"backtrack-only\"\n").unwrap();

    let cli = Config::parse_from(["test", "--conf-file", conf_path.to_str().unwrap()]);
    let config = load_config(cli).unwrap();
    assert_eq!(config.port_count, Some(6));
    assert_eq!(config.num_flows, Some(3));

    // SAFETY: the tests that touch the environment are run serially.
    unsafe {
        std::env::set_var("VTURN_NUM_FLOWS", "7");
    }
    let cli = Config::parse_from([
        "test",
        "--conf-file",
        conf_path.to_str().unwrap(),
        "--port-count",
        "10",
    ]);
    let config = load_config(cli).unwrap();
    clear_env();

    assert_eq!(config.port_count, Some(10));
    assert_eq!(config.num_flows, Some(7));
    assert_eq!(config.policy.as_deref(), Some("backtrack-only"));
    assert_eq!(config.conf_file.as_deref(), Some(conf_path.as_path()));
}

#[test]
fn missing_conf_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let err = parse_extra_conf_file(&missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let cli = Config {
        conf_file: Some(missing),
        ..Config::default()
    };
    assert!(matches!(load_config(cli), Err(ConfigError::Io(_))));
}

#[test]
fn directory_conf_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_extra_conf_file(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IsADirectory);
}

#[test]
fn empty_conf_file_path() {
    assert!(parse_extra_conf_file(Path::new("")).is_ok());
}

#[test]
#[serial]
fn bad_value_type() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let conf_path = dir.path().join("bad.toml");
    fs::write(&conf_path, "port_count = \"eight\"\n").unwrap();

    let cli = Config {
        port_count: None,
        policy: None,
        num_flows: None,
        conf_file: Some(conf_path),
    };
    assert!(matches!(load_config(cli), Err(ConfigError::Extract(_))));
}
