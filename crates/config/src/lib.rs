use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "streamcast.toml",
    "config/streamcast.toml",
    "crates/config/streamcast.toml",
    "../streamcast.toml",
    "../config/streamcast.toml",
    "../crates/config/streamcast.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub relay: RelayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://streamcast.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Tunables for the in-memory session relay.
///
/// ```
/// use streamcast_config::RelayConfig;
///
/// let relay = RelayConfig::default();
/// assert_eq!(relay.max_chat_length, 500);
/// assert_eq!(relay.max_sender_length, 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "RelayConfig::default_max_chat_length")]
    pub max_chat_length: usize,
    #[serde(default = "RelayConfig::default_max_sender_length")]
    pub max_sender_length: usize,
}

impl RelayConfig {
    const fn default_max_chat_length() -> usize {
        500
    }

    const fn default_max_sender_length() -> usize {
        50
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_chat_length: Self::default_max_chat_length(),
            max_sender_length: Self::default_max_sender_length(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use streamcast_config::load;
///
/// std::env::remove_var("STREAMCAST_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default(
            "relay.max_chat_length",
            i64::try_from(defaults.relay.max_chat_length).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "relay.max_sender_length",
            i64::try_from(defaults.relay.max_sender_length).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("STREAMCAST").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("STREAMCAST_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via STREAMCAST_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
