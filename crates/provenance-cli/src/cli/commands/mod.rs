//! Command implementations.

pub mod ca;
pub mod challenge;
pub mod enroll;
pub mod manage;
pub mod status;
pub mod verify;

use std::path::Path;

use anyhow::Context as _;
use provenance::{Config, Provenance};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration
    pub config: Config,

    /// Output format
    pub output_format: OutputFormat,
}

impl Context {
    /// Open the CA and certificate store named by the configuration.
    pub fn open(&self) -> anyhow::Result<Provenance> {
        Provenance::open(&self.config).context("failed to open provenance services")
    }

    /// Whether output should be JSON.
    pub const fn json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }
}

/// Read a PEM public key file.
pub(crate) fn read_public_key(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read public key {}", path.display()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A context whose CA key and database live under `dir`.
    pub fn context(dir: &Path, output_format: OutputFormat) -> Context {
        let mut config = Config::default();
        config.ca.key_path = Some(dir.join("ca-key.pem"));
        config.store.database_path = Some(dir.join("certificates.db"));
        Context {
            config,
            output_format,
        }
    }
}
