use provenance_core::{DownloadError, StoreError};
use thiserror::Error;

/// Result type alias for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors from downloading, decoding, validating or attributing a manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Not well-formed CBOR of the expected shape
    #[error("failed to parse manifest: {0}")]
    ParseFailure(String),

    /// Required top-level structure is missing or empty
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// No assertion labelled `c2pa.signature`
    #[error("manifest missing signature assertion")]
    MissingSignatureAssertion,

    /// The signature assertion carries no certificate chain
    #[error("signature assertion missing certificate chain")]
    MissingCertChain,

    /// The leaf certificate is not base64 DER X.509
    #[error("invalid leaf certificate: {0}")]
    InvalidCertificate(String),

    /// The signature assertion carries no signature
    #[error("signature assertion missing signature field")]
    MissingSignature,

    /// The signature is not base64 or decodes to nothing
    #[error("invalid manifest signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// The manifest could not be fetched
    #[error("failed to download manifest: {0}")]
    DownloadFailed(#[from] DownloadError),

    /// The certificate store could not be queried
    #[error("certificate lookup failed: {0}")]
    LookupFailed(#[from] StoreError),
}

impl ManifestError {
    /// Returns true if the same request may succeed later.
    ///
    /// Only transient download failures qualify. A bad manifest stays bad.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::DownloadFailed(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for problems with the manifest content itself.
    ///
    /// These degrade content to "unverified" rather than failing a request.
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        !matches!(self, Self::DownloadFailed(_) | Self::LookupFailed(_))
    }

    /// Stable machine-readable kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ParseFailure(_) => "ParseFailure",
            Self::MalformedManifest(_) => "MalformedManifest",
            Self::MissingSignatureAssertion => "MissingSignatureAssertion",
            Self::MissingCertChain => "MissingCertChain",
            Self::InvalidCertificate(_) => "InvalidCertificate",
            Self::MissingSignature => "MissingSignature",
            Self::InvalidSignatureEncoding(_) => "InvalidSignatureEncoding",
            Self::DownloadFailed(_) => "DownloadFailed",
            Self::LookupFailed(_) => "LookupFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_downloads_retry() {
        assert!(ManifestError::DownloadFailed(DownloadError::Status { status: 503 }).is_retryable());
        assert!(!ManifestError::DownloadFailed(DownloadError::Status { status: 404 }).is_retryable());
        assert!(!ManifestError::MissingSignatureAssertion.is_retryable());
        assert!(!ManifestError::ParseFailure("eof".into()).is_retryable());
    }

    #[test]
    fn test_validation_errors() {
        assert!(ManifestError::MissingCertChain.is_validation_error());
        assert!(!ManifestError::LookupFailed(StoreError::Backend("db".into())).is_validation_error());
    }
}
