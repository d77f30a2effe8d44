//! Configuration file.
//!
//! ```toml
//! [ca]
//! key_path = "/var/lib/provenance/ca-key.pem"
//! certificate_validity_days = 365
//! organization = "Verifiable SN"
//!
//! [store]
//! database_path = "/var/lib/provenance/certificates.db"
//!
//! [download]
//! timeout_secs = 30
//! max_retries = 3
//!
//! [manifest]
//! max_manifest_bytes = 16777216
//! require_claim_entries = false
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use provenance_ca::CaSubject;
use provenance_manifest::{RetryConfig, ValidationPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const CONFIG_FILE: &str = "config.toml";
const CA_KEY_FILE: &str = "ca-key.pem";
const DATABASE_FILE: &str = "certificates.db";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ca: CaConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub manifest: ValidationPolicy,
}

/// `[ca]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaConfig {
    /// PKCS#8 PEM of the CA private key (default: data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Lifetime of issued device certificates
    #[serde(default = "default_validity_days")]
    pub certificate_validity_days: u32,

    #[serde(flatten)]
    pub subject: CaSubject,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file (default: data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

/// `[download]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            key_path: None,
            certificate_validity_days: default_validity_days(),
            subject: CaSubject::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl CaConfig {
    /// Device certificate lifetime.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        Duration::from_secs(self.certificate_validity_days as u64 * 24 * 60 * 60)
    }
}

impl DownloadConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn retry(&self) -> RetryConfig {
        RetryConfig::new()
            .max_retries(self.max_retries)
            .initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .max_backoff(Duration::from_millis(self.max_backoff_ms))
    }
}

impl Config {
    /// Platform directories for this application.
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("sn", "verifiable", "provenance").ok_or(Error::NoHomeDirectory)
    }

    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Configured CA key path, or the default under the data directory.
    pub fn ca_key_path(&self) -> Result<PathBuf> {
        match &self.ca.key_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join(CA_KEY_FILE)),
        }
    }

    /// Configured database path, or the default under the data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.store.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

// Default value functions for serde.
const fn default_validity_days() -> u32 {
    365
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}
