use provenance_core::{IdentityId, IssuerError, StoreError};
use thiserror::Error;

/// Result type alias for enrollment operations
pub type Result<T> = std::result::Result<T, EnrollError>;

/// Errors that can occur during enrollment and certificate lifecycle
/// operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollError {
    /// The identity already holds a certificate
    #[error("certificate already issued for identity {0}")]
    AlreadyEnrolled(IdentityId),

    /// The public key PEM/DER could not be decoded
    #[error("invalid public key encoding: {0}")]
    InvalidPublicKeyEncoding(String),

    /// The public key is not an ECDSA P-256 key
    #[error("unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    /// The signature is not base64 or not 64 raw bytes
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// The signature does not verify against the challenge
    #[error("challenge signature verification failed")]
    SignatureVerificationFailed,

    /// The certificate authority failed to issue
    #[error("failed to issue certificate: {0}")]
    IssuanceFailed(#[source] IssuerError),

    /// The certificate store failed
    #[error("failed to store certificate: {0}")]
    StorageFailed(#[source] StoreError),

    /// No certificate exists for the identity
    #[error("certificate not found for identity {0}")]
    NotFound(IdentityId),
}

impl EnrollError {
    /// Returns true if the fault lies in the client's input
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::IssuanceFailed(_) | Self::StorageFailed(_))
    }

    /// Returns true if the client may retry the same request after a delay.
    ///
    /// Server-side failures leave no state behind.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::IssuanceFailed(_) | Self::StorageFailed(_))
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::IssuanceFailed(_) | Self::StorageFailed(_) => 500,
            _ => 400,
        }
    }

    /// Stable machine-readable kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyEnrolled(_) => "AlreadyEnrolled",
            Self::InvalidPublicKeyEncoding(_) => "InvalidPublicKeyEncoding",
            Self::UnsupportedKeyAlgorithm(_) => "UnsupportedKeyAlgorithm",
            Self::InvalidSignatureEncoding(_) => "InvalidSignatureEncoding",
            Self::SignatureVerificationFailed => "SignatureVerificationFailed",
            Self::IssuanceFailed(_) => "IssuanceFailed",
            Self::StorageFailed(_) => "StorageFailed",
            Self::NotFound(_) => "NotFound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = IdentityId::new();
        assert_eq!(EnrollError::AlreadyEnrolled(id).status_code(), 400);
        assert_eq!(EnrollError::SignatureVerificationFailed.status_code(), 400);
        assert_eq!(EnrollError::NotFound(id).status_code(), 404);
        assert_eq!(
            EnrollError::StorageFailed(StoreError::Backend("down".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_only_server_faults() {
        assert!(EnrollError::IssuanceFailed(IssuerError::Signing("hsm".into())).is_retryable());
        assert!(!EnrollError::SignatureVerificationFailed.is_retryable());
        assert!(EnrollError::UnsupportedKeyAlgorithm("RSA".into()).is_client_error());
    }

    #[test]
    fn test_already_enrolled_message() {
        let id = IdentityId::new();
        assert!(EnrollError::AlreadyEnrolled(id)
            .to_string()
            .starts_with("certificate already issued"));
    }
}
