//! Tests for the `streamcast-config` loader: default handling, file
//! discovery, and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use streamcast_config::{load, AppConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "STREAMCAST_CONFIG",
    "STREAMCAST__DATABASE__MAX_CONNECTIONS",
    "STREAMCAST__DATABASE__URL",
    "STREAMCAST__HTTP__ADDRESS",
    "STREAMCAST__HTTP__PORT",
    "STREAMCAST__RELAY__MAX_CHAT_LENGTH",
    "STREAMCAST__RELAY__MAX_SENDER_LENGTH",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        let mut ctx = Self {
            vars: Vec::new(),
            original_dir: None,
        };
        for key in ENV_VARS_TO_RESET {
            ctx.remove_var(key);
        }
        ctx
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_file_or_environment() {
    let _ctx = TestContext::new();

    let config = load().expect("defaults should load");
    let expected = AppConfig::default();

    assert_eq!(config.http.address, expected.http.address);
    assert_eq!(config.http.port, expected.http.port);
    assert_eq!(config.database.url, expected.database.url);
    assert_eq!(config.relay.max_chat_length, 500);
    assert_eq!(config.relay.max_sender_length, 50);
}

#[test]
#[serial]
fn environment_variables_override_defaults() {
    let mut ctx = TestContext::new();
    ctx.set_var("STREAMCAST__HTTP__PORT", "9191");
    ctx.set_var("STREAMCAST__RELAY__MAX_CHAT_LENGTH", "120");

    let config = load().expect("environment overrides should load");

    assert_eq!(config.http.port, 9191);
    assert_eq!(config.relay.max_chat_length, 120);
}

#[test]
#[serial]
fn explicit_config_file_is_honoured() {
    let mut ctx = TestContext::new();
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[http]
address = "0.0.0.0"
port = 8088

[database]
url = "sqlite://custom.db"
max_connections = 3

[relay]
max_chat_length = 200
max_sender_length = 32
"#,
    )
    .expect("write config file");

    ctx.set_var("STREAMCAST_CONFIG", path.to_string_lossy());

    let config = load().expect("file-backed configuration should load");

    assert_eq!(config.http.address, "0.0.0.0");
    assert_eq!(config.http.port, 8088);
    assert_eq!(config.database.url, "sqlite://custom.db");
    assert_eq!(config.database.max_connections, 3);
    assert_eq!(config.relay.max_chat_length, 200);
    assert_eq!(config.relay.max_sender_length, 32);
}

#[test]
#[serial]
fn config_file_is_discovered_in_working_directory() {
    let mut ctx = TestContext::new();
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("streamcast.toml"),
        r#"
[http]
address = "127.0.0.1"
port = 7171
"#,
    )
    .expect("write config file");

    ctx.set_current_dir(dir.path());

    let config = load().expect("discovered configuration should load");

    assert_eq!(config.http.port, 7171);
    // Unspecified sections fall back to defaults.
    assert_eq!(config.relay.max_chat_length, 500);
}
