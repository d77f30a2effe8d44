use provenance_ca::CaError;
use provenance_core::{DownloadError, StoreError};
use thiserror::Error;

/// Result type alias for setting up the provenance services
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or wiring services together
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be parsed or written
    #[error("configuration error: {0}")]
    Config(String),

    /// No home directory to derive default paths from
    #[error("could not determine config directory")]
    NoHomeDirectory,

    /// Certificate authority could not be loaded or created
    #[error(transparent)]
    Ca(#[from] CaError),

    /// Certificate store could not be opened
    #[error("failed to open certificate store: {0}")]
    Store(#[from] StoreError),

    /// HTTP client could not be built
    #[error("failed to set up manifest download: {0}")]
    Download(#[from] DownloadError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
