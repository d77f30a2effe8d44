//! # provenance-store
//!
//! [`CertificateStore`] on top of SQLite.
//!
//! ## Schema
//!
//! ```text
//! user_certificates
//!   identity_id      TEXT    UNIQUE   -- at most one certificate per identity
//!   certificate_der  BLOB
//!   certificate_pem  TEXT
//!   public_key_pem   TEXT
//!   fingerprint      BLOB    UNIQUE   -- join key from content to identity
//!   active           BOOLEAN
//!   created_at, updated_at
//! ```
//!
//! Uniqueness is enforced by the database, so two racing enrollments for
//! the same identity cannot both insert: the loser gets
//! [`StoreError::IdentityConflict`].

mod sqlite;

pub use sqlite::SqliteCertificateStore;

pub use provenance_core::{CertificateStore, StoreError};
