//! Structural manifest validation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ciborium::Value;
use provenance_core::hash::{sha256, DIGEST_LEN};
use provenance_core::Fingerprint;
use serde::{Deserialize, Serialize};
use tracing::debug;
use x509_parser::prelude::*;

use crate::decode::{decode_manifest, text_keyed, type_name, ContentManifest};
use crate::{ManifestError, Result};

/// Label of the assertion carrying the signer's certificate chain.
pub const SIGNATURE_ASSERTION_LABEL: &str = "c2pa.signature";

/// Largest manifest accepted by default (16 MiB).
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 16 * 1024 * 1024;

/// Knobs for [`ManifestValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Reject inputs larger than this before decoding
    pub max_manifest_bytes: usize,
    /// Reject manifests whose `claim` map is empty.
    ///
    /// Off by default, so `claim = {}` validates. Set it to get the strict
    /// rule, where an empty claim is [`ManifestError::MalformedManifest`]
    /// ("claim is empty").
    pub require_claim_entries: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            require_claim_entries: false,
        }
    }
}

/// What a valid manifest yields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedManifest {
    /// SHA-256 of the exact bytes received
    pub manifest_hash: [u8; DIGEST_LEN],
    /// SHA-256 of the leaf certificate DER
    pub cert_fingerprint: Fingerprint,
    /// DER of the leaf certificate
    pub leaf_certificate: Vec<u8>,
    /// The decoded manifest
    pub manifest: ContentManifest,
}

impl ValidatedManifest {
    /// Manifest hash as lowercase hex.
    #[must_use]
    pub fn manifest_hash_hex(&self) -> String {
        hex::encode(self.manifest_hash)
    }
}

/// Validates raw manifests against a [`ValidationPolicy`].
///
/// Pure: no I/O and no shared state, so one validator can be used from any
/// number of tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestValidator {
    policy: ValidationPolicy,
}

impl ManifestValidator {
    #[must_use]
    pub const fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate `raw` and extract the manifest hash and the leaf
    /// certificate fingerprint.
    pub fn validate(&self, raw: &[u8]) -> Result<ValidatedManifest> {
        if raw.len() > self.policy.max_manifest_bytes {
            return Err(ManifestError::ParseFailure(format!(
                "manifest is {} bytes, limit is {}",
                raw.len(),
                self.policy.max_manifest_bytes
            )));
        }

        let manifest_hash = sha256(raw);
        let manifest = decode_manifest(raw)?;

        match &manifest.claim {
            None => {
                return Err(ManifestError::MalformedManifest(String::from(
                    "missing claim",
                )))
            }
            Some(claim) if claim.is_empty() && self.policy.require_claim_entries => {
                return Err(ManifestError::MalformedManifest(String::from(
                    "claim is empty",
                )))
            }
            Some(_) => {}
        }
        if manifest.assertions.is_empty() {
            return Err(ManifestError::MalformedManifest(String::from(
                "assertions are missing or empty",
            )));
        }

        let assertion = manifest
            .find_assertion(SIGNATURE_ASSERTION_LABEL)
            .ok_or(ManifestError::MissingSignatureAssertion)?;
        let data = match &assertion.data {
            Some(Value::Map(entries)) => text_keyed(entries.clone()),
            other => {
                debug!(
                    data = other.as_ref().map_or("absent", type_name),
                    "signature assertion data is not a map"
                );
                return Err(ManifestError::MissingCertChain);
            }
        };

        let leaf_certificate = leaf_certificate(data.get("cert_chain"))?;
        let cert_fingerprint = Fingerprint::of_der(&leaf_certificate);

        check_signature(data.get("signature"))?;

        debug!(
            fingerprint = %cert_fingerprint,
            bytes = raw.len(),
            "manifest validated"
        );

        Ok(ValidatedManifest {
            manifest_hash,
            cert_fingerprint,
            leaf_certificate,
            manifest,
        })
    }
}

/// Validate with the default policy.
pub fn validate_manifest(raw: &[u8]) -> Result<ValidatedManifest> {
    ManifestValidator::default().validate(raw)
}

/// Decode and parse the first entry of `cert_chain`.
fn leaf_certificate(chain: Option<&Value>) -> Result<Vec<u8>> {
    let leaf = match chain {
        Some(Value::Array(chain)) => chain.first().ok_or(ManifestError::MissingCertChain)?,
        _ => return Err(ManifestError::MissingCertChain),
    };

    let Value::Text(encoded) = leaf else {
        return Err(ManifestError::InvalidCertificate(format!(
            "leaf is {}, expected base64 text",
            type_name(leaf)
        )));
    };
    let der = STANDARD
        .decode(encoded)
        .map_err(|e| ManifestError::InvalidCertificate(format!("invalid base64: {e}")))?;

    let (rest, _) = X509Certificate::from_der(&der)
        .map_err(|e| ManifestError::InvalidCertificate(e.to_string()))?;
    if !rest.is_empty() {
        return Err(ManifestError::InvalidCertificate(format!(
            "{} trailing bytes after certificate",
            rest.len()
        )));
    }

    Ok(der)
}

fn check_signature(signature: Option<&Value>) -> Result<()> {
    let encoded = match signature {
        None | Some(Value::Null) => return Err(ManifestError::MissingSignature),
        Some(Value::Text(encoded)) => encoded,
        Some(other) => {
            return Err(ManifestError::InvalidSignatureEncoding(format!(
                "signature is {}, expected base64 text",
                type_name(other)
            )))
        }
    };

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|e| ManifestError::InvalidSignatureEncoding(e.to_string()))?;
    if decoded.is_empty() {
        return Err(ManifestError::InvalidSignatureEncoding(String::from(
            "empty signature",
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::decode::test_support::*;
    use provenance_ca::{CaSubject, LocalCa};

    fn leaf_der() -> Vec<u8> {
        LocalCa::generate(CaSubject::default())
            .unwrap()
            .certificate_der()
            .to_vec()
    }

    fn chain_and_signature(chain: Value, signature: Value) -> Vec<u8> {
        manifest_with_data(map(vec![("cert_chain", chain), ("signature", signature)]))
    }

    fn assert_err(raw: &[u8], expected: fn(&ManifestError) -> bool) {
        let err = validate_manifest(raw).unwrap_err();
        assert!(expected(&err), "unexpected error: {err:?}");
    }

    #[test]
    fn test_minimal_manifest() {
        let der = leaf_der();
        let raw = minimal_manifest(&der);

        let first = validate_manifest(&raw).unwrap();
        assert_eq!(first.manifest_hash, sha256(&raw));
        assert_eq!(first.cert_fingerprint, Fingerprint::of_der(&der));
        assert_eq!(first.leaf_certificate, der);

        let second = validate_manifest(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_signature_assertion() {
        let raw = encode(&map(vec![
            ("claim", map(vec![])),
            (
                "assertions",
                Value::Array(vec![map(vec![
                    ("label", text("c2pa.actions")),
                    ("data", map(vec![])),
                ])]),
            ),
        ]));
        assert_eq!(
            validate_manifest(&raw),
            Err(ManifestError::MissingSignatureAssertion)
        );
    }

    #[test]
    fn test_first_signature_assertion_wins() {
        let der = leaf_der();
        let good = map(vec![
            (
                "cert_chain",
                Value::Array(vec![text(&STANDARD.encode(&der))]),
            ),
            ("signature", text("c2lnbmF0dXJl")),
        ]);
        let raw = encode(&map(vec![
            ("claim", map(vec![])),
            (
                "assertions",
                Value::Array(vec![
                    map(vec![("label", text("c2pa.signature")), ("data", good)]),
                    map(vec![("label", text("c2pa.signature")), ("data", map(vec![]))]),
                ]),
            ),
        ]));
        assert!(validate_manifest(&raw).is_ok());
    }

    #[test]
    fn test_malformed_structure() {
        let is_malformed = |e: &ManifestError| matches!(e, ManifestError::MalformedManifest(_));

        assert_err(&encode(&map(vec![])), is_malformed);
        assert_err(
            &encode(&map(vec![("assertions", Value::Array(vec![]))])),
            is_malformed,
        );
        assert_err(
            &encode(&map(vec![
                ("claim", map(vec![])),
                ("assertions", Value::Array(vec![])),
            ])),
            is_malformed,
        );
    }

    #[test]
    fn test_empty_claim_policy() {
        let raw = minimal_manifest(&leaf_der());
        assert!(validate_manifest(&raw).is_ok());

        let strict = ManifestValidator::new(ValidationPolicy {
            require_claim_entries: true,
            ..ValidationPolicy::default()
        });
        assert!(matches!(
            strict.validate(&raw),
            Err(ManifestError::MalformedManifest(ref m)) if m.contains("claim is empty")
        ));
    }

    #[test]
    fn test_size_limit() {
        let raw = minimal_manifest(&leaf_der());
        let tight = ManifestValidator::new(ValidationPolicy {
            max_manifest_bytes: raw.len() - 1,
            ..ValidationPolicy::default()
        });
        assert!(matches!(
            tight.validate(&raw),
            Err(ManifestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_missing_cert_chain() {
        let sig = text("c2ln");
        assert_eq!(
            validate_manifest(&manifest_with_data(map(vec![("signature", sig.clone())]))),
            Err(ManifestError::MissingCertChain)
        );
        assert_eq!(
            validate_manifest(&chain_and_signature(Value::Array(vec![]), sig.clone())),
            Err(ManifestError::MissingCertChain)
        );
        assert_eq!(
            validate_manifest(&chain_and_signature(text("not-a-list"), sig)),
            Err(ManifestError::MissingCertChain)
        );
        assert_eq!(
            validate_manifest(&manifest_with_data(text("not-a-map"))),
            Err(ManifestError::MissingCertChain)
        );
    }

    #[test]
    fn test_invalid_certificate() {
        let is_invalid = |e: &ManifestError| matches!(e, ManifestError::InvalidCertificate(_));
        let sig = text("c2ln");

        assert_err(
            &chain_and_signature(Value::Array(vec![text("%%%")]), sig.clone()),
            is_invalid,
        );
        assert_err(
            &chain_and_signature(
                Value::Array(vec![text(&STANDARD.encode(b"not a certificate"))]),
                sig.clone(),
            ),
            is_invalid,
        );
        assert_err(
            &chain_and_signature(Value::Array(vec![Value::Bytes(leaf_der())]), sig),
            is_invalid,
        );
    }

    #[test]
    fn test_signature_field() {
        let der = leaf_der();
        let chain = Value::Array(vec![text(&STANDARD.encode(&der))]);

        assert_eq!(
            validate_manifest(&manifest_with_data(map(vec![("cert_chain", chain.clone())]))),
            Err(ManifestError::MissingSignature)
        );

        let is_bad_encoding =
            |e: &ManifestError| matches!(e, ManifestError::InvalidSignatureEncoding(_));
        assert_err(&chain_and_signature(chain.clone(), text("")), is_bad_encoding);
        assert_err(&chain_and_signature(chain.clone(), text("***")), is_bad_encoding);
        assert_err(
            &chain_and_signature(chain, Value::Bytes(vec![1, 2, 3])),
            is_bad_encoding,
        );
    }

    #[test]
    fn test_parse_failure_propagates() {
        assert!(matches!(
            validate_manifest(b"\xff\xff"),
            Err(ManifestError::ParseFailure(_))
        ));
    }
}
