//! SHA-256 helpers via `ring::digest`.

use ring::digest::{digest, Context, SHA256, SHA256_OUTPUT_LEN};

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = SHA256_OUTPUT_LEN;

/// Compute SHA-256 of raw bytes.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let d = digest(&SHA256, data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(d.as_ref());
    out
}

/// Compute SHA-256 over several byte slices, in order, as one message.
#[must_use]
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let mut context = Context::new(&SHA256);
    for part in parts {
        context.update(part);
    }
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(context.finish().as_ref());
    out
}

/// Compute SHA-256 of raw bytes, lowercase hex-encoded.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
