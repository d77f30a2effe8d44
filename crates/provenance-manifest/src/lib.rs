//! # provenance-manifest
//!
//! Attribution of published content to an enrolled identity.
//!
//! ```text
//! manifest URI ──download──▶ raw CBOR ──validate──▶ (manifest hash, leaf fingerprint)
//!                                                        │
//!                                     resolve by fingerprint in the certificate store
//!                                                        │
//!                                  Verified { identity } │ Unverified { reason }
//! ```
//!
//! Validation is structural: the manifest must carry a `c2pa.signature`
//! assertion with a parseable leaf certificate and a non-empty signature.
//! The signature itself is not checked against a payload, and the chain is
//! not walked to a root.

pub mod decode;
pub mod download;
mod error;
pub mod pipeline;
pub mod resolve;
pub mod validate;

pub use decode::{decode_manifest, Assertion, ContentManifest};
pub use download::{HttpManifestStorage, RetryConfig};
pub use error::{ManifestError, Result};
pub use pipeline::{ProvenanceLabel, ProvenanceReport, ProvenanceService};
pub use resolve::ProvenanceResolver;
pub use validate::{
    validate_manifest, ManifestValidator, ValidatedManifest, ValidationPolicy,
    DEFAULT_MAX_MANIFEST_BYTES, SIGNATURE_ASSERTION_LABEL,
};
