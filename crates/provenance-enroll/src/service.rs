//! Enrollment and certificate lifecycle.

use std::sync::Arc;
use std::time::Duration;

use provenance_core::{
    CertificateIssuer, CertificateStore, Fingerprint, IdentityId, NewCertificate, StoreError,
    UserCertificate,
};
use tracing::{debug, info, instrument, warn};

use crate::verifier::verify_proof_of_possession;
use crate::{EnrollError, Result};

/// Device certificate lifetime when none is configured (365 days).
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A successful enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// PEM of the issued certificate
    pub certificate_pem: String,
    /// SHA-256 of the certificate DER
    pub fingerprint: Fingerprint,
    /// The public key PEM exactly as submitted
    pub public_key_pem: String,
}

/// Issues certificates to identities that prove key possession, and
/// manages the resulting records.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn CertificateStore>,
    issuer: Arc<dyn CertificateIssuer>,
    validity: Duration,
}

impl EnrollmentService {
    /// Create a service issuing certificates valid for [`DEFAULT_VALIDITY`].
    pub fn new(store: Arc<dyn CertificateStore>, issuer: Arc<dyn CertificateIssuer>) -> Self {
        Self {
            store,
            issuer,
            validity: DEFAULT_VALIDITY,
        }
    }

    /// Override the certificate lifetime.
    #[must_use]
    pub const fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// The store this service writes to.
    pub fn store(&self) -> Arc<dyn CertificateStore> {
        Arc::clone(&self.store)
    }

    /// Enroll `identity` with the submitted public key.
    ///
    /// The stored record starts inactive. Nothing is persisted unless every
    /// check passes and the CA issues.
    #[instrument(skip(self, public_key_pem, challenge_signature), fields(identity = %identity))]
    pub async fn enroll(
        &self,
        identity: IdentityId,
        public_key_pem: &str,
        challenge_signature: &str,
    ) -> Result<Enrollment> {
        if self.check_enrolled(identity).await? {
            warn!("enrollment rejected: identity already holds a certificate");
            return Err(EnrollError::AlreadyEnrolled(identity));
        }

        verify_proof_of_possession(identity, public_key_pem, challenge_signature).map_err(|e| {
            warn!(error = %e, "enrollment rejected");
            e
        })?;
        debug!("proof of possession verified");

        let issued = self
            .issuer
            .issue(public_key_pem, identity, self.validity)
            .await
            .map_err(EnrollError::IssuanceFailed)?;

        let record = NewCertificate {
            identity_id: identity,
            certificate_der: issued.der,
            certificate_pem: issued.pem,
            public_key_pem: public_key_pem.to_string(),
            fingerprint: issued.fingerprint,
            active: false,
        };

        let stored = self.store.insert(record).await.map_err(|e| match e {
            // Lost a race with a concurrent enrollment for the same identity.
            StoreError::IdentityConflict(_) => EnrollError::AlreadyEnrolled(identity),
            other => EnrollError::StorageFailed(other),
        })?;

        info!(fingerprint = %stored.fingerprint, "identity enrolled");

        Ok(Enrollment {
            certificate_pem: stored.certificate_pem,
            fingerprint: stored.fingerprint,
            public_key_pem: stored.public_key_pem,
        })
    }

    /// Whether `identity` already holds a certificate.
    pub async fn check_enrolled(&self, identity: IdentityId) -> Result<bool> {
        self.store
            .find_by_identity(identity)
            .await
            .map(|found| found.is_some())
            .map_err(EnrollError::StorageFailed)
    }

    /// The certificate record held by `identity`.
    pub async fn get_certificate(&self, identity: IdentityId) -> Result<UserCertificate> {
        self.store
            .find_by_identity(identity)
            .await
            .map_err(EnrollError::StorageFailed)?
            .ok_or(EnrollError::NotFound(identity))
    }

    /// Mark the identity's certificate as the trusted anchor, or stop
    /// trusting it.
    pub async fn set_active(&self, identity: IdentityId, active: bool) -> Result<()> {
        let found = self
            .store
            .set_active(identity, active)
            .await
            .map_err(EnrollError::StorageFailed)?;
        if !found {
            return Err(EnrollError::NotFound(identity));
        }
        info!(identity = %identity, active, "certificate state changed");
        Ok(())
    }

    /// Delete the identity's certificate so it may enroll again.
    pub async fn revoke(&self, identity: IdentityId) -> Result<()> {
        let found = self
            .store
            .delete(identity)
            .await
            .map_err(EnrollError::StorageFailed)?;
        if !found {
            return Err(EnrollError::NotFound(identity));
        }
        info!(identity = %identity, "certificate revoked");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use provenance_ca::{CaSubject, LocalCa};
    use provenance_core::MemoryCertificateStore;

    use super::EnrollmentService;

    pub fn service() -> (EnrollmentService, Arc<MemoryCertificateStore>) {
        let store = Arc::new(MemoryCertificateStore::new());
        let ca = Arc::new(LocalCa::generate(CaSubject::default()).unwrap());
        (EnrollmentService::new(store.clone(), ca), store)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::service;
    use super::*;
    use crate::verifier::test_keys::*;
    use async_trait::async_trait;
    use provenance_core::{IssuedCertificate, IssuerError, MemoryCertificateStore};
    use x509_parser::prelude::*;

    struct FailingIssuer;

    #[async_trait]
    impl CertificateIssuer for FailingIssuer {
        async fn issue(
            &self,
            _public_key_pem: &str,
            _identity: IdentityId,
            _validity: Duration,
        ) -> std::result::Result<IssuedCertificate, IssuerError> {
            Err(IssuerError::Signing(String::from("hsm offline")))
        }
    }

    #[tokio::test]
    async fn test_enroll_issues_inactive_certificate() {
        let (service, store) = service();
        let key = device_key(1);
        let pem = public_pem(&key);
        let id = IdentityId::new();

        let enrollment = service
            .enroll(id, &pem, &sign_challenge(&key, id, &pem))
            .await
            .unwrap();
        assert!(enrollment.certificate_pem.contains("BEGIN CERTIFICATE"));
        assert_eq!(enrollment.public_key_pem, pem);

        let record = store.find_by_identity(id).await.unwrap().unwrap();
        assert!(!record.active);
        assert_eq!(record.fingerprint, Fingerprint::of_der(&record.certificate_der));
        assert_eq!(record.fingerprint, enrollment.fingerprint);
        assert!(service.check_enrolled(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_issued_certificate_carries_submitted_key() {
        let (service, _) = service();
        let key = device_key(4);
        let pem = public_pem(&key);
        let id = IdentityId::new();
        service
            .enroll(id, &pem, &sign_challenge(&key, id, &pem))
            .await
            .unwrap();

        let record = service.get_certificate(id).await.unwrap();
        let (_, cert) = X509Certificate::from_der(&record.certificate_der).unwrap();
        let expected = key.verifying_key().to_encoded_point(false);
        assert_eq!(
            cert.public_key().subject_public_key.data.as_ref(),
            expected.as_bytes()
        );
        assert!(cert.subject().to_string().contains(&id.to_string()));

        let lifetime = cert.validity().not_after.timestamp() - cert.validity().not_before.timestamp();
        assert_eq!(lifetime, 365 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn test_second_enrollment_rejected() {
        let (service, store) = service();
        let key = device_key(1);
        let pem = public_pem(&key);
        let id = IdentityId::new();
        let sig = sign_challenge(&key, id, &pem);

        service.enroll(id, &pem, &sig).await.unwrap();
        let err = service.enroll(id, &pem, &sig).await.unwrap_err();
        assert_eq!(err, EnrollError::AlreadyEnrolled(id));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rejections_leave_no_record() {
        let (service, store) = service();
        let key = device_key(1);
        let pem = public_pem(&key);
        let id = IdentityId::new();

        let err = service
            .enroll(id, &pem, &sign_challenge(&device_key(2), id, &pem))
            .await
            .unwrap_err();
        assert_eq!(err, EnrollError::SignatureVerificationFailed);

        let err = service.enroll(id, "garbage", "AAAA").await.unwrap_err();
        assert!(matches!(err, EnrollError::InvalidPublicKeyEncoding(_)));

        assert!(store.is_empty().await);
        assert!(!service.check_enrolled(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_issuer_failure_is_reported() {
        let store = Arc::new(MemoryCertificateStore::new());
        let service = EnrollmentService::new(store.clone(), Arc::new(FailingIssuer));
        let key = device_key(1);
        let pem = public_pem(&key);
        let id = IdentityId::new();

        let err = service
            .enroll(id, &pem, &sign_challenge(&key, id, &pem))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::IssuanceFailed(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_enrollments_single_winner() {
        let (service, store) = service();
        let id = IdentityId::new();

        let mut handles = Vec::new();
        for seed in 1..=8u8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let key = device_key(seed);
                let pem = public_pem(&key);
                service.enroll(id, &pem, &sign_challenge(&key, id, &pem)).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e, EnrollError::AlreadyEnrolled(id)),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (service, _) = service();
        let key = device_key(1);
        let pem = public_pem(&key);
        let id = IdentityId::new();

        assert_eq!(
            service.get_certificate(id).await,
            Err(EnrollError::NotFound(id))
        );
        assert_eq!(
            service.set_active(id, true).await,
            Err(EnrollError::NotFound(id))
        );

        service
            .enroll(id, &pem, &sign_challenge(&key, id, &pem))
            .await
            .unwrap();
        service.set_active(id, true).await.unwrap();
        assert!(service.get_certificate(id).await.unwrap().active);

        service.revoke(id).await.unwrap();
        assert!(!service.check_enrolled(id).await.unwrap());
        assert_eq!(service.revoke(id).await, Err(EnrollError::NotFound(id)));

        // A revoked identity can enroll again with a fresh key.
        let key = device_key(9);
        let pem = public_pem(&key);
        service
            .enroll(id, &pem, &sign_challenge(&key, id, &pem))
            .await
            .unwrap();
    }
}
