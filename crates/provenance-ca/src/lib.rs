//! # provenance-ca
//!
//! Local certificate authority for device enrollment.
//!
//! ## Architecture
//!
//! ```text
//! LOCAL CA (self-signed, 10 years)
//!        │
//!        └── Device certificates (one per enrolled identity)
//!              CN = serialNumber = identity UUID
//!              KeyUsage = digitalSignature, EKU = clientAuth
//! ```
//!
//! The CA never sees a client private key: it signs over the
//! SubjectPublicKeyInfo the client has already proven possession of.
//!
//! ## Example
//!
//! ```rust,ignore
//! use provenance_ca::{CaSubject, LocalCa};
//!
//! let ca = LocalCa::generate(CaSubject::default())?;
//! let issued = ca.issue_for(&public_key_pem, identity, ValidityPeriod::Device.duration())?;
//! println!("{}", issued.fingerprint);
//! ```

mod authority;
mod error;
mod inspect;

pub use authority::LocalCa;
pub use error::CaError;
pub use inspect::{summarize, CertificateSummary};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds in one day.
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Naming policy for the CA certificate and the device certificates it
/// issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaSubject {
    /// Organization (O) on both CA and device certificates
    #[serde(default = "default_organization")]
    pub organization: String,
    /// Country (C) on both CA and device certificates
    #[serde(default = "default_country")]
    pub country: String,
    /// Common name (CN) of the CA certificate
    #[serde(default = "default_common_name")]
    pub common_name: String,
}

impl Default for CaSubject {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            country: default_country(),
            common_name: default_common_name(),
        }
    }
}

fn default_organization() -> String {
    String::from("Verifiable SN")
}

fn default_country() -> String {
    String::from("US")
}

fn default_common_name() -> String {
    String::from("Verifiable SN CA")
}

/// Validity period presets.
#[derive(Debug, Clone, Copy)]
pub enum ValidityPeriod {
    /// CA certificate: 10 years
    Authority,
    /// Device certificate: 1 year
    Device,
    /// Custom duration in days
    Custom(u32),
}

impl ValidityPeriod {
    /// Get the number of days for this validity period.
    pub const fn days(&self) -> u32 {
        match self {
            Self::Authority => 10 * 365,
            Self::Device => 365,
            Self::Custom(d) => *d,
        }
    }

    /// The period as a [`Duration`].
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.days() as u64 * SECS_PER_DAY)
    }
}
