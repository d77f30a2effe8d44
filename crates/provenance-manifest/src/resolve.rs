//! Fingerprint to identity resolution.

use std::sync::Arc;

use provenance_core::{CertificateStore, Fingerprint, StoreError, UserCertificate};
use tracing::debug;

/// Maps a leaf certificate fingerprint back to the enrolled identity.
#[derive(Clone)]
pub struct ProvenanceResolver {
    store: Arc<dyn CertificateStore>,
}

impl ProvenanceResolver {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// The certificate record with this fingerprint.
    ///
    /// `Ok(None)` means the content is unverified; it is not a failure.
    pub async fn resolve(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<UserCertificate>, StoreError> {
        let found = self.store.find_by_fingerprint(fingerprint).await?;
        debug!(
            fingerprint = %fingerprint,
            found = found.is_some(),
            "resolved certificate fingerprint"
        );
        Ok(found)
    }
}
