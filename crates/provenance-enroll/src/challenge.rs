//! Challenge derivation and signature codec.

use p256::ecdsa::Signature;
use p256::FieldBytes;
use provenance_core::hash::{sha256_parts, DIGEST_LEN};
use provenance_core::IdentityId;

use crate::{EnrollError, Result};

/// Length of a raw `r || s` P-256 signature.
pub const RAW_SIGNATURE_LEN: usize = 64;

const SCALAR_LEN: usize = RAW_SIGNATURE_LEN / 2;

/// The 32-byte digest a client must sign to enroll `public_key_pem`.
///
/// `SHA-256("{identity}:{public_key_pem}")` where the identity is rendered
/// as a lowercase hyphenated UUID and the PEM is used byte-for-byte,
/// trailing newline included.
#[must_use]
pub fn derive_challenge(identity: IdentityId, public_key_pem: &str) -> [u8; DIGEST_LEN] {
    let id = identity.to_string();
    sha256_parts(&[id.as_bytes(), b":", public_key_pem.as_bytes()])
}

/// A raw ECDSA signature split into big-endian scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    pub r: [u8; SCALAR_LEN],
    pub s: [u8; SCALAR_LEN],
}

/// Split a 64-byte `r || s` signature.
pub fn decode_raw_signature(bytes: &[u8]) -> Result<RawSignature> {
    if bytes.len() != RAW_SIGNATURE_LEN {
        return Err(EnrollError::InvalidSignatureEncoding(format!(
            "expected {RAW_SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let (r_bytes, s_bytes) = bytes.split_at(SCALAR_LEN);
    let mut r = [0u8; SCALAR_LEN];
    let mut s = [0u8; SCALAR_LEN];
    r.copy_from_slice(r_bytes);
    s.copy_from_slice(s_bytes);
    Ok(RawSignature { r, s })
}

/// Encode a raw signature as the DER `SEQUENCE { r INTEGER, s INTEGER }`
/// expected by standard verifiers.
///
/// Scalars outside `[1, n-1]` can never verify and are reported as
/// [`EnrollError::SignatureVerificationFailed`].
pub fn encode_asn1(signature: &RawSignature) -> Result<Vec<u8>> {
    let sig = Signature::from_scalars(FieldBytes::from(signature.r), FieldBytes::from(signature.s))
        .map_err(|_| EnrollError::SignatureVerificationFailed)?;
    Ok(sig.to_der().as_bytes().to_vec())
}
