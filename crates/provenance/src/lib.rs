//! Device enrollment and C2PA manifest attribution for verifiable content.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use provenance::{Config, Provenance};
//!
//! #[tokio::main]
//! async fn main() -> provenance::Result<()> {
//!     let config = Config::load(&Config::default_path()?)?;
//!     let app = Provenance::open(&config)?;
//!
//!     // Attribute a published manifest to its author
//!     let report = app.provenance.label_uri("https://cdn.example/m.c2pa").await?;
//!     println!("{:?}", report.label);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `sqlite`
//! - `sqlite` - Persistent certificate store; without it [`Provenance`]
//!   keeps certificates in memory

mod app;
pub mod config;
mod error;

pub use app::Provenance;
pub use config::Config;
pub use error::{Error, Result};

// Core types and collaborator traits
pub use provenance_core::*;

// Re-export the component crates
pub use provenance_ca as ca;
pub use provenance_enroll as enroll;
pub use provenance_manifest as manifest;
#[cfg(feature = "sqlite")]
pub use provenance_store as store;

pub use provenance_enroll::{CertificateApi, EnrollError, EnrollmentService};
pub use provenance_manifest::{ManifestError, ProvenanceLabel, ProvenanceService};

// Re-export runtime for convenience
pub use tokio;
