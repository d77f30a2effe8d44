//! Proof-of-possession verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use provenance_core::IdentityId;
use tracing::debug;
use x509_parser::prelude::*;

use crate::challenge::{decode_raw_signature, derive_challenge, encode_asn1};
use crate::{EnrollError, Result};

const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";

/// Name a key algorithm OID for error messages.
fn algorithm_name(oid: &str) -> &str {
    match oid {
        "1.2.840.113549.1.1.1" => "RSA",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        "1.2.840.10040.4.1" => "DSA",
        other => other,
    }
}

/// Parse a PEM `PUBLIC KEY` block and require an ECDSA P-256 key.
pub fn parse_public_key(public_key_pem: &str) -> Result<VerifyingKey> {
    let block = ::pem::parse(public_key_pem)
        .map_err(|e| EnrollError::InvalidPublicKeyEncoding(e.to_string()))?;
    if block.tag() != PUBLIC_KEY_TAG {
        return Err(EnrollError::InvalidPublicKeyEncoding(format!(
            "expected {PUBLIC_KEY_TAG} block, got {}",
            block.tag()
        )));
    }

    let (rest, spki) = SubjectPublicKeyInfo::from_der(block.contents())
        .map_err(|e| EnrollError::InvalidPublicKeyEncoding(e.to_string()))?;
    if !rest.is_empty() {
        return Err(EnrollError::InvalidPublicKeyEncoding(format!(
            "{} trailing bytes after SubjectPublicKeyInfo",
            rest.len()
        )));
    }

    let algorithm = spki.algorithm.algorithm.to_id_string();
    if algorithm != OID_EC_PUBLIC_KEY {
        return Err(EnrollError::UnsupportedKeyAlgorithm(
            algorithm_name(&algorithm).to_string(),
        ));
    }

    let curve = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.as_oid().ok())
        .map(|oid| oid.to_id_string());
    if curve.as_deref() != Some(OID_CURVE_P256) {
        return Err(EnrollError::UnsupportedKeyAlgorithm(format!(
            "ECDSA on curve {}",
            curve.as_deref().unwrap_or("<unspecified>")
        )));
    }

    VerifyingKey::from_sec1_bytes(spki.subject_public_key.data.as_ref())
        .map_err(|e| EnrollError::InvalidPublicKeyEncoding(format!("invalid EC point: {e}")))
}

/// Check that `signature_b64` is a valid signature by the private half of
/// `public_key_pem` over the enrollment challenge for `identity`.
///
/// Checks run in order: key decoding and algorithm, signature decoding,
/// then verification. Returns the parsed key on success.
pub fn verify_proof_of_possession(
    identity: IdentityId,
    public_key_pem: &str,
    signature_b64: &str,
) -> Result<VerifyingKey> {
    let key = parse_public_key(public_key_pem)?;
    let challenge = derive_challenge(identity, public_key_pem);

    let raw = STANDARD
        .decode(signature_b64)
        .map_err(|e| EnrollError::InvalidSignatureEncoding(format!("invalid base64: {e}")))?;
    let der = encode_asn1(&decode_raw_signature(&raw)?)?;
    let signature =
        Signature::from_der(&der).map_err(|_| EnrollError::SignatureVerificationFailed)?;

    key.verify_prehash(&challenge, &signature).map_err(|_| {
        debug!(identity = %identity, "challenge signature did not verify");
        EnrollError::SignatureVerificationFailed
    })?;

    Ok(key)
}

#[cfg(test)]
pub(crate) mod test_keys {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use p256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::{Signature, SigningKey};
    use p256::pkcs8::{EncodePublicKey, LineEnding};
    use provenance_core::IdentityId;

    use crate::challenge::derive_challenge;

    /// Deterministic device key; `seed` must be non-zero.
    pub fn device_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    pub fn public_pem(key: &SigningKey) -> String {
        key.verifying_key().to_public_key_pem(LineEnding::LF).unwrap()
    }

    pub fn raw_signature(key: &SigningKey, identity: IdentityId, pem: &str) -> Vec<u8> {
        let sig: Signature = key.sign_prehash(&derive_challenge(identity, pem)).unwrap();
        sig.to_bytes().to_vec()
    }

    pub fn sign_challenge(key: &SigningKey, identity: IdentityId, pem: &str) -> String {
        STANDARD.encode(raw_signature(key, identity, pem))
    }
}
