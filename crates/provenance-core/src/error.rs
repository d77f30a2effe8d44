use std::time::Duration;

use thiserror::Error;

use crate::types::{Fingerprint, IdentityId};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core value types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Fingerprint text was not 32 bytes of hex
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Identity text was not a UUID
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

/// Errors reported by a [`CertificateStore`](crate::CertificateStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record for this identity already exists
    #[error("identity {0} already has a certificate")]
    IdentityConflict(IdentityId),

    /// A record with this fingerprint already exists
    #[error("fingerprint {0} is already registered")]
    FingerprintConflict(Fingerprint),

    /// The backing store failed
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if the error is a uniqueness violation
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::IdentityConflict(_) | Self::FingerprintConflict(_)
        )
    }
}

/// Errors reported by a [`CertificateIssuer`](crate::CertificateIssuer)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuerError {
    /// The submitted public key could not be used for issuance
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Requested validity cannot be represented
    #[error("invalid validity period: {0}")]
    InvalidValidity(String),

    /// Certificate construction or signing failed
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors reported by a [`ManifestStorage`](crate::ManifestStorage)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// The URI could not be parsed
    #[error("invalid manifest URI: {0}")]
    InvalidUri(String),

    /// Server answered with a non-success status
    #[error("manifest download returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Connection could not be established or was dropped
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Body could not be read
    #[error("failed to read manifest body: {0}")]
    Body(String),

    /// Body is larger than the accepted manifest size
    #[error("manifest exceeds {limit} bytes")]
    TooLarge {
        /// Largest accepted body, in bytes
        limit: usize,
    },
}

impl DownloadError {
    /// Returns true if retrying the same request may succeed.
    ///
    /// Connection failures, timeouts and 5xx answers are transient;
    /// 4xx answers and malformed URIs are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::Body(_) => true,
            Self::Status { status } => *status >= 500,
            Self::InvalidUri(_) | Self::TooLarge { .. } => false,
        }
    }
}
