//! The local certificate authority.
//!
//! Holds the CA key in memory and signs device certificates over
//! client-submitted public keys.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use provenance_core::{CertificateIssuer, Fingerprint, IdentityId, IssuedCertificate, IssuerError};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SerialNumber, SubjectPublicKeyInfo,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{CaError, CaSubject, ValidityPeriod};

/// OID of the X.520 `serialNumber` attribute (2.5.4.5).
const OID_DN_SERIAL_NUMBER: [u64; 4] = [2, 5, 4, 5];

/// PEM tag of a SubjectPublicKeyInfo block.
const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

/// Local certificate authority.
///
/// The CA certificate is regenerated from the key on every construction,
/// so only the key needs to be persisted. Certificates already issued
/// stay valid because their issuer name and signing key do not change.
pub struct LocalCa {
    /// Key pair for signing
    key_pair: KeyPair,
    /// The self-signed CA certificate
    certificate: Certificate,
    /// Naming policy
    subject: CaSubject,
}

impl LocalCa {
    /// Create a CA with a freshly generated ECDSA P-256 key.
    pub fn generate(subject: CaSubject) -> Result<Self, CaError> {
        let key_pair = KeyPair::generate()?;
        Self::with_key(key_pair, subject)
    }

    /// Create a CA from a PKCS#8 PEM private key.
    pub fn from_key_pem(key_pem: &str, subject: CaSubject) -> Result<Self, CaError> {
        let key_pair = KeyPair::from_pem(key_pem)?;
        Self::with_key(key_pair, subject)
    }

    /// Load the CA key from `key_path` if it exists, otherwise generate a
    /// new CA in memory.
    pub fn load_or_generate(key_path: Option<&Path>, subject: CaSubject) -> Result<Self, CaError> {
        match key_path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading CA key");
                let key_pem = std::fs::read_to_string(path)?;
                Self::from_key_pem(&key_pem, subject)
            }
            _ => {
                info!("no CA key configured, generating an ephemeral CA");
                Self::generate(subject)
            }
        }
    }

    fn with_key(key_pair: KeyPair, subject: CaSubject) -> Result<Self, CaError> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, subject.common_name.as_str());
        dn.push(DnType::OrganizationName, subject.organization.as_str());
        dn.push(DnType::CountryName, subject.country.as_str());
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyCertSign,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ClientAuth,
            ExtendedKeyUsagePurpose::ServerAuth,
        ];

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::days(i64::from(ValidityPeriod::Authority.days()));
        params.serial_number = Some(SerialNumber::from(1u64));

        let certificate = params.self_signed(&key_pair)?;

        Ok(Self {
            key_pair,
            certificate,
            subject,
        })
    }

    /// Issue a device certificate binding `public_key_pem` to `identity`.
    pub fn issue_for(
        &self,
        public_key_pem: &str,
        identity: IdentityId,
        validity: Duration,
    ) -> Result<IssuedCertificate, CaError> {
        let block = ::pem::parse(public_key_pem).map_err(|e| CaError::Pem(e.to_string()))?;
        if block.tag() != PUBLIC_KEY_TAG {
            return Err(CaError::PublicKey(format!(
                "expected {PUBLIC_KEY_TAG} block, got {}",
                block.tag()
            )));
        }
        let subject_key = SubjectPublicKeyInfo::from_der(block.contents())
            .map_err(|e| CaError::PublicKey(e.to_string()))?;

        let secs = i64::try_from(validity.as_secs())
            .map_err(|_| CaError::Validity(format!("{validity:?} is too long")))?;
        let now = time::OffsetDateTime::now_utc();
        let not_after = now
            .checked_add(time::Duration::seconds(secs))
            .ok_or_else(|| CaError::Validity(format!("{validity:?} overflows")))?;

        let mut params = CertificateParams::default();

        let id = identity.to_string();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, id.as_str());
        dn.push(DnType::CustomDnType(OID_DN_SERIAL_NUMBER.to_vec()), id.as_str());
        dn.push(DnType::OrganizationName, self.subject.organization.as_str());
        dn.push(DnType::CountryName, self.subject.country.as_str());
        params.distinguished_name = dn;

        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        params.not_before = now;
        params.not_after = not_after;

        // Positive 127-bit serial.
        let mut serial = *Uuid::new_v4().as_bytes();
        serial[0] &= 0x7f;
        params.serial_number = Some(SerialNumber::from_slice(&serial));

        let cert = params.signed_by(&subject_key, &self.certificate, &self.key_pair)?;
        let der = cert.der().to_vec();
        let fingerprint = Self::compute_fingerprint(&der);

        info!(identity = %identity, fingerprint = %fingerprint, "issued device certificate");

        Ok(IssuedCertificate {
            pem: cert.pem(),
            der,
            fingerprint,
        })
    }

    /// SHA-256 fingerprint of a DER certificate.
    pub fn compute_fingerprint(certificate_der: &[u8]) -> Fingerprint {
        Fingerprint::of_der(certificate_der)
    }

    /// PEM of the CA certificate.
    pub fn certificate_pem(&self) -> String {
        self.certificate.pem()
    }

    /// DER of the CA certificate.
    pub fn certificate_der(&self) -> &[u8] {
        self.certificate.der()
    }

    /// PKCS#8 PEM of the CA private key.
    pub fn private_key_pem(&self) -> String {
        self.key_pair.serialize_pem()
    }

    /// Naming policy in use.
    pub const fn subject(&self) -> &CaSubject {
        &self.subject
    }

    /// Save the key and certificate to files.
    pub fn save_to_files(
        &self,
        key_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
    ) -> Result<(), CaError> {
        std::fs::write(key_path, self.private_key_pem())?;
        std::fs::write(cert_path, self.certificate_pem())?;
        Ok(())
    }
}

#[async_trait]
impl CertificateIssuer for LocalCa {
    async fn issue(
        &self,
        public_key_pem: &str,
        identity: IdentityId,
        validity: Duration,
    ) -> Result<IssuedCertificate, IssuerError> {
        self.issue_for(public_key_pem, identity, validity)
            .map_err(IssuerError::from)
    }
}
