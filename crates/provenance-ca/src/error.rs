//! Error types for the local certificate authority.

use provenance_core::IssuerError;
use thiserror::Error;

/// Errors that can occur in CA operations.
#[derive(Error, Debug)]
pub enum CaError {
    /// Certificate generation or signing failed.
    #[error("certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    /// A PEM block could not be decoded.
    #[error("pem decode failed: {0}")]
    Pem(String),

    /// The subject public key is not usable for issuance.
    #[error("invalid public key: {0}")]
    PublicKey(String),

    /// Requested validity cannot be represented.
    #[error("invalid validity: {0}")]
    Validity(String),

    /// A certificate could not be parsed.
    #[error("certificate parse failed: {0}")]
    Parse(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CaError> for IssuerError {
    fn from(err: CaError) -> Self {
        match err {
            CaError::PublicKey(reason) | CaError::Pem(reason) => Self::InvalidPublicKey(reason),
            CaError::Validity(reason) => Self::InvalidValidity(reason),
            other => Self::Signing(other.to_string()),
        }
    }
}
