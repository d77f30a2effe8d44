//! # provenance-cli
//!
//! Operator command-line interface for the provenance services.
//!
//! ## Features
//!
//! - **Local CA**: create and inspect the issuing certificate authority
//! - **Enrollment**: derive challenges, enroll device keys, manage state
//! - **Verification**: attribute a C2PA manifest file or URL to its author
//! - **Output formats**: colored text or JSON

pub mod cli;
pub mod output;

pub use cli::run;
