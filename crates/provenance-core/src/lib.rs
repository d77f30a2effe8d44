//! # provenance-core
//!
//! Shared building blocks for device enrollment and manifest attribution.
//!
//! - **Types**: [`IdentityId`], [`Fingerprint`], [`UserCertificate`]
//! - **Collaborators**: [`CertificateStore`], [`CertificateIssuer`],
//!   [`ManifestStorage`] -- the narrow contracts the enrollment and
//!   provenance halves call out to
//! - **Errors**: one enum per collaborator contract
//!
//! ## Trust anchor
//!
//! ```text
//! Enrollment:  client key --(proof-of-possession)--> CA issue --> UserCertificate
//!                                                                   │ fingerprint
//! Provenance:  manifest --> leaf cert --> SHA-256 ───────────────────┘
//! ```
//!
//! Both halves meet at the certificate fingerprint: SHA-256 over the DER
//! bytes of the issued certificate.

#![doc(html_root_url = "https://docs.rs/provenance-core/0.3.0")]

mod error;
pub mod hash;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{CoreError, DownloadError, IssuerError, Result, StoreError};
pub use store::MemoryCertificateStore;
pub use traits::{CertificateIssuer, CertificateStore, ManifestStorage};
pub use types::*;
