//! Configuration loading and validation.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional config file (TOML, YAML or JSON, chosen by extension).
//! 3. Environment variables prefixed with `PARCEL_`, using `__` between
//!    nested keys (`PARCEL_SERVER__LISTEN=0.0.0.0:8080`).
//!
//! Relative paths are resolved against the working directory once loading
//! is done, so the rest of the program only ever sees absolute paths.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "PARCEL_";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub max_upload_size: u64,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            max_upload_size: 50 * 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one file per upload.
    pub blob_dir: PathBuf,
    /// SQLite database file. Must not be inside `blob_dir`.
    pub database: PathBuf,
}
impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            blob_dir: data_dir.join("uploads"),
            database: data_dir.join("parcel.db"),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Seconds a login stays valid.
    pub session_ttl: u64,
}
impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }
}
impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            session_ttl: 24 * 60 * 60,
        }
    }
}
// Keep the password out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

/// Per-user data directory, or `./data` where there is no such thing.
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "parcel")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl Config {
    /// Load configuration from defaults, an optional file, and the
    /// environment; then resolve paths and validate.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR));

        let mut config: Config = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.resolve_paths()?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn resolve_paths(&mut self) -> Result<()> {
        for path in [&mut self.storage.blob_dir, &mut self.storage.database] {
            *path = std::path::absolute(&*path).or_raise(|| ErrorKind::InvalidPath(path.clone()))?;
        }
        Ok(())
    }

    /// Check the settings make sense together.
    pub fn validate(&self) -> Result<()> {
        if self.auth.username.is_empty() {
            exn::bail!(ErrorKind::InvalidSetting("auth.username", "must not be empty"));
        }
        if self.auth.session_ttl == 0 {
            exn::bail!(ErrorKind::InvalidSetting("auth.session_ttl", "must be at least one second"));
        }
        if self.server.max_upload_size == 0 {
            exn::bail!(ErrorKind::InvalidSetting("server.max_upload_size", "must be greater than zero"));
        }
        if self.storage.database.starts_with(&self.storage.blob_dir) {
            exn::bail!(ErrorKind::DatabaseInBlobDir(self.storage.database.clone(), self.storage.blob_dir.clone()));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
