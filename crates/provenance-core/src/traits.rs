//! Collaborator contracts.
//!
//! The enrollment service and the provenance resolver only ever talk to
//! storage, the CA and object storage through these traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DownloadError, IssuerError, StoreError};
use crate::types::{Fingerprint, IdentityId, IssuedCertificate, NewCertificate, UserCertificate};

/// Persistence for [`UserCertificate`] records.
///
/// Implementations must enforce uniqueness of both `identity_id` and
/// `fingerprint` atomically inside [`insert`](Self::insert): two concurrent
/// inserts for the same identity must never both succeed.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Look up the record owned by an identity.
    async fn find_by_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<UserCertificate>, StoreError>;

    /// Look up the record with the given certificate fingerprint.
    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<UserCertificate>, StoreError>;

    /// Insert a new record.
    ///
    /// Fails with [`StoreError::IdentityConflict`] or
    /// [`StoreError::FingerprintConflict`] on a uniqueness violation.
    async fn insert(&self, record: NewCertificate) -> Result<UserCertificate, StoreError>;

    /// Set the `active` flag. Returns `false` if no record exists.
    async fn set_active(&self, identity: IdentityId, active: bool) -> Result<bool, StoreError>;

    /// Delete the record. Returns `false` if no record existed.
    async fn delete(&self, identity: IdentityId) -> Result<bool, StoreError>;
}

/// A certificate authority that binds a proven public key to an identity.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Issue a certificate for `public_key_pem` naming `identity`, valid for
    /// `validity` from now.
    async fn issue(
        &self,
        public_key_pem: &str,
        identity: IdentityId,
        validity: Duration,
    ) -> Result<IssuedCertificate, IssuerError>;
}

/// Object storage holding raw manifest bytes.
#[async_trait]
pub trait ManifestStorage: Send + Sync {
    /// Fetch the manifest at `uri`.
    async fn download(&self, uri: &str) -> Result<Vec<u8>, DownloadError>;
}
