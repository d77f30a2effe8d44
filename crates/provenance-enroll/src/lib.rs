//! # provenance-enroll
//!
//! Certificate enrollment with proof-of-possession.
//!
//! A device proves it controls the private key for the public key it
//! submits by signing a challenge derived from its identity and that
//! public key. Only then does the CA issue a certificate.
//!
//! ## Flow
//!
//! ```text
//! client                                   server
//!   challenge = SHA-256("{identity}:{public key PEM}")
//!   sig = ECDSA-P256(challenge)  ──────▶  reject if already enrolled
//!                                         parse SPKI, require EC P-256
//!                                         verify sig over challenge
//!                                         CA issue (365 days)
//!                                         store (active = false)
//!                          ◀──────────    certificate PEM + fingerprint
//! ```
//!
//! The challenge is recomputed rather than stored. The same
//! `(identity, key)` pair always yields the same challenge; replays are
//! harmless only because an identity holds at most one certificate.

pub mod api;
pub mod challenge;
mod error;
pub mod service;
pub mod verifier;

pub use api::{ApiResponse, CertificateApi};
pub use challenge::{decode_raw_signature, derive_challenge, encode_asn1, RawSignature};
pub use error::{EnrollError, Result};
pub use service::{Enrollment, EnrollmentService, DEFAULT_VALIDITY};
pub use verifier::{parse_public_key, verify_proof_of_possession};
