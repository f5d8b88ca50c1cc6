//! Client configuration and resource location resolution.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use gasp_common::{EntityKind, Error, ResourceUri};

/// Settings for the Gasp sync client.
///
/// Read from a JSON file; every field is optional and falls back to its
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaspConfig {
    /// Base URI of the Gasp server.
    pub server_uri: String,
    /// Location of the reviews collection, relative to `server_uri`.
    pub reviews_location: String,
    /// Location of the users collection, relative to `server_uri`.
    pub users_location: String,
    /// Location of the restaurants collection, relative to `server_uri`.
    pub restaurants_location: String,
    /// SQLite database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Seconds between passes in `watch` mode.
    pub sync_interval_secs: u64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GaspConfig {
    fn default() -> Self {
        Self {
            server_uri: "http://localhost:8080".to_string(),
            reviews_location: "/reviews".to_string(),
            users_location: "/users".to_string(),
            restaurants_location: "/restaurants".to_string(),
            database_path: None,
            sync_interval_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl GaspConfig {
    /// Default configuration file location (`<config dir>/gasp/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gasp").join("config.json"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if present, otherwise built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Database file, falling back to `<data dir>/gasp/gasp.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("gasp").join("gasp.db")))
            .unwrap_or_else(|| PathBuf::from("gasp.db"))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn location(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Review => &self.reviews_location,
            EntityKind::User => &self.users_location,
            EntityKind::Restaurant => &self.restaurants_location,
        }
    }

    /// Fully resolved location of the collection for `kind`.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the result is not an absolute http(s) URI
    pub fn resource_uri(&self, kind: EntityKind) -> gasp_common::Result<ResourceUri> {
        let raw = format!(
            "{}/{}",
            self.server_uri.trim_end_matches('/'),
            self.location(kind).trim_start_matches('/')
        );

        let parsed = url::Url::parse(&raw).map_err(|e| {
            Error::InvalidArgument(format!("Invalid {} URI {:?}: {}", kind, raw, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidArgument(format!(
                "Unsupported scheme for {} URI: {}",
                kind, raw
            )));
        }

        ResourceUri::new(raw)
    }
}
