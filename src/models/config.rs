//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tree store backend settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Primary and legacy top-level keys
    #[serde(default)]
    pub namespaces: NamespaceConfig,

    /// Bulk reconciliation behavior
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply store overrides from the process environment.
    ///
    /// - `FIREBASE_DATABASE_URL`: database URL; selects the firebase backend
    /// - `FIREBASE_AUTH_TOKEN`: auth token, unless the file sets one
    /// - `STORE_BACKEND`: `firebase`, `local` or `memory`; wins over the URL
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.store.auth_token.is_none() {
            self.store.auth_token = var("FIREBASE_AUTH_TOKEN").filter(|t| !t.trim().is_empty());
        }
        if let Some(url) = var("FIREBASE_DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.store.database_url = url;
            self.store.backend = StoreBackend::Firebase;
        }
        if let Some(name) = var("STORE_BACKEND").filter(|b| !b.trim().is_empty()) {
            self.store.backend = StoreBackend::parse(&name)
                .ok_or_else(|| AppError::config(format!("unknown STORE_BACKEND '{}'", name)))?;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        match self.store.backend {
            StoreBackend::Firebase => {
                if self.store.database_url.trim().is_empty() {
                    return Err(AppError::validation(
                        "store.database_url is required for the firebase backend",
                    ));
                }
                url::Url::parse(&self.store.database_url)?;
            }
            StoreBackend::Local => {
                if self.store.local_path.trim().is_empty() {
                    return Err(AppError::validation(
                        "store.local_path is required for the local backend",
                    ));
                }
            }
            StoreBackend::Memory => {}
        }
        if self.store.timeout_secs == 0 {
            return Err(AppError::validation("store.timeout_secs must be > 0"));
        }
        if self.namespaces.primary.trim().is_empty() {
            return Err(AppError::validation("namespaces.primary is empty"));
        }
        if self.namespaces.legacy_namespace() == Some(self.namespaces.primary.as_str()) {
            return Err(AppError::validation(
                "namespaces.legacy must differ from namespaces.primary",
            ));
        }
        if self.reconcile.max_concurrent == 0 {
            return Err(AppError::validation("reconcile.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

/// Which tree store implementation to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Realtime database REST API
    Firebase,
    /// JSON export on local disk
    #[default]
    Local,
    /// In-process tree, empty at start
    Memory,
}

impl StoreBackend {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "firebase" => Some(Self::Firebase),
            "local" => Some(Self::Local),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Tree store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the realtime database, e.g. `https://<project>.firebaseio.com`
    #[serde(default)]
    pub database_url: String,

    /// Database secret or ID token, sent as the `auth` query parameter
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Path of the JSON export used by the local backend
    #[serde(default = "defaults::local_path")]
    pub local_path: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_url: String::new(),
            auth_token: None,
            local_path: defaults::local_path(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Top-level keys the application data lives under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Current schema generation
    #[serde(default = "defaults::primary_namespace")]
    pub primary: String,

    /// Older capitalized generation; empty string disables it
    #[serde(default = "defaults::legacy_namespace")]
    pub legacy: String,

    /// Mirror every write into the legacy namespace
    #[serde(default = "defaults::dual_write")]
    pub dual_write: bool,
}

impl NamespaceConfig {
    /// Legacy namespace, `None` when disabled.
    pub fn legacy_namespace(&self) -> Option<&str> {
        let legacy = self.legacy.trim();
        (!legacy.is_empty()).then_some(legacy)
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            primary: defaults::primary_namespace(),
            legacy: defaults::legacy_namespace(),
            dual_write: defaults::dual_write(),
        }
    }
}

/// Bulk reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Courses processed at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Compute plans without writing
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            dry_run: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    pub fn local_path() -> String {
        "storage/database.json".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        concat!("course-reconciler/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn primary_namespace() -> String {
        "elearning".into()
    }
    pub fn legacy_namespace() -> String {
        "Elearning".into()
    }
    pub fn dual_write() -> bool {
        true
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
