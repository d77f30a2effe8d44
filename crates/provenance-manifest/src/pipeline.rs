//! Download, validate and attribute in one call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use provenance_core::{CertificateStore, Fingerprint, IdentityId, ManifestStorage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::resolve::ProvenanceResolver;
use crate::validate::ManifestValidator;
use crate::{ManifestError, Result};

/// What to show next to a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvenanceLabel {
    /// Signed with a certificate issued to `identity`
    Verified {
        identity: IdentityId,
        fingerprint: Fingerprint,
        /// Whether that certificate is the identity's current anchor
        active: bool,
    },
    /// Could not be attributed; `reason` is for display and logs only
    Unverified { reason: String },
}

impl ProvenanceLabel {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// The label plus whatever could be extracted on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceReport {
    pub label: ProvenanceLabel,
    /// Hex SHA-256 of the manifest, when it validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,
    /// Claim `created` time, when present and readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProvenanceReport {
    fn unverified(err: &ManifestError) -> Self {
        Self {
            label: ProvenanceLabel::Unverified {
                reason: err.to_string(),
            },
            manifest_hash: None,
            created_at: None,
        }
    }
}

/// Turns a manifest into a [`ProvenanceLabel`].
///
/// Validation failures degrade to [`ProvenanceLabel::Unverified`]; only
/// download and store failures are returned as errors, since those may
/// succeed on retry.
#[derive(Clone)]
pub struct ProvenanceService {
    storage: Arc<dyn ManifestStorage>,
    validator: ManifestValidator,
    resolver: ProvenanceResolver,
}

impl ProvenanceService {
    pub fn new(
        storage: Arc<dyn ManifestStorage>,
        validator: ManifestValidator,
        store: Arc<dyn CertificateStore>,
    ) -> Self {
        Self {
            storage,
            validator,
            resolver: ProvenanceResolver::new(store),
        }
    }

    /// Fetch the manifest at `uri` and label it.
    #[instrument(skip(self))]
    pub async fn label_uri(&self, uri: &str) -> Result<ProvenanceReport> {
        let raw = self.storage.download(uri).await?;
        self.label_bytes(&raw).await
    }

    /// Label manifest bytes already in hand.
    pub async fn label_bytes(&self, raw: &[u8]) -> Result<ProvenanceReport> {
        let validated = match self.validator.validate(raw) {
            Ok(validated) => validated,
            Err(e) => {
                debug!(error = %e, kind = e.kind(), "manifest failed validation");
                return Ok(ProvenanceReport::unverified(&e));
            }
        };

        let manifest_hash = Some(validated.manifest_hash_hex());
        let created_at = validated.manifest.created_at().unwrap_or_else(|e| {
            debug!(error = %e, "ignoring unreadable claim timestamp");
            None
        });

        let fingerprint = validated.cert_fingerprint;
        let label = match self.resolver.resolve(&fingerprint).await? {
            Some(cert) => {
                info!(
                    identity = %cert.identity_id,
                    fingerprint = %fingerprint,
                    active = cert.active,
                    "content attributed"
                );
                ProvenanceLabel::Verified {
                    identity: cert.identity_id,
                    fingerprint,
                    active: cert.active,
                }
            }
            None => ProvenanceLabel::Unverified {
                reason: format!("no enrolled certificate with fingerprint {fingerprint}"),
            },
        };

        Ok(ProvenanceReport {
            label,
            manifest_hash,
            created_at,
        })
    }
}
