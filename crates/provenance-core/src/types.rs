//! Certificate and identity types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CoreError;
use crate::hash::{sha256, DIGEST_LEN};

/// Opaque identifier of an enrolled user/device.
///
/// The canonical string form is the lowercase hyphenated UUID; it is what
/// the enrollment challenge and the certificate subject are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Generate a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for IdentityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidIdentity(format!("{s}: {e}")))
    }
}

impl From<Uuid> for IdentityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// SHA-256 fingerprint of a certificate's DER encoding.
///
/// Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; DIGEST_LEN]);

impl Fingerprint {
    /// Fingerprint a DER-encoded certificate.
    #[must_use]
    pub fn of_der(der: &[u8]) -> Self {
        Self(sha256(der))
    }

    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex fingerprint. An optional `0x` prefix and embedded spaces
    /// are accepted.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        let clean: String = trimmed
            .strip_prefix("0x")
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let bytes = hex::decode(&clean)
            .map_err(|e| CoreError::InvalidFingerprint(format!("{s}: {e}")))?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidFingerprint(format!(
                "expected {DIGEST_LEN} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Output of a certificate authority for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// DER bytes of the issued X.509 certificate
    pub der: Vec<u8>,
    /// PEM encoding of the same bytes
    pub pem: String,
    /// SHA-256 of `der`
    pub fingerprint: Fingerprint,
}

/// A record to be inserted into a certificate store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub identity_id: IdentityId,
    pub certificate_der: Vec<u8>,
    pub certificate_pem: String,
    pub public_key_pem: String,
    pub fingerprint: Fingerprint,
    pub active: bool,
}

/// The certificate bound to an enrolled identity.
///
/// At most one exists per identity; `fingerprint` is globally unique and is
/// the join key from content back to its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCertificate {
    /// Owning user/device
    pub identity_id: IdentityId,
    /// DER bytes of the CA-issued certificate
    #[serde(with = "der_hex")]
    pub certificate_der: Vec<u8>,
    /// PEM of `certificate_der`
    pub certificate_pem: String,
    /// SubjectPublicKeyInfo the client proved possession of
    pub public_key_pem: String,
    /// SHA-256 of `certificate_der`
    pub fingerprint: Fingerprint,
    /// Whether this is the currently trusted anchor for the identity
    pub active: bool,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
    /// Last lifecycle change
    pub updated_at: DateTime<Utc>,
}

impl UserCertificate {
    /// Build a stored record from an insert request, stamping both
    /// timestamps with `now`.
    #[must_use]
    pub fn from_new(new: NewCertificate, now: DateTime<Utc>) -> Self {
        Self {
            identity_id: new.identity_id,
            certificate_der: new.certificate_der,
            certificate_pem: new.certificate_pem,
            public_key_pem: new.public_key_pem,
            fingerprint: new.fingerprint,
            active: new.active,
            created_at: now,
            updated_at: now,
        }
    }
}

mod der_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
