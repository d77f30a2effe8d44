//! In-memory certificate store.
//!
//! Both indexes live behind a single write lock, so the uniqueness checks
//! and the insert are one atomic step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::CertificateStore;
use crate::types::{Fingerprint, IdentityId, NewCertificate, UserCertificate};

#[derive(Default)]
struct Tables {
    by_identity: HashMap<IdentityId, UserCertificate>,
    by_fingerprint: HashMap<Fingerprint, IdentityId>,
}

/// A [`CertificateStore`] held entirely in process memory.
#[derive(Default)]
pub struct MemoryCertificateStore {
    tables: RwLock<Tables>,
}

impl MemoryCertificateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_identity.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.by_identity.is_empty()
    }
}

#[async_trait]
impl CertificateStore for MemoryCertificateStore {
    async fn find_by_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<UserCertificate>, StoreError> {
        Ok(self.tables.read().await.by_identity.get(&identity).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<UserCertificate>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_fingerprint
            .get(fingerprint)
            .and_then(|id| tables.by_identity.get(id))
            .cloned())
    }

    async fn insert(&self, record: NewCertificate) -> Result<UserCertificate, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.by_identity.contains_key(&record.identity_id) {
            return Err(StoreError::IdentityConflict(record.identity_id));
        }
        if tables.by_fingerprint.contains_key(&record.fingerprint) {
            return Err(StoreError::FingerprintConflict(record.fingerprint));
        }

        let stored = UserCertificate::from_new(record, Utc::now());
        tables
            .by_fingerprint
            .insert(stored.fingerprint, stored.identity_id);
        tables.by_identity.insert(stored.identity_id, stored.clone());

        debug!(identity = %stored.identity_id, fingerprint = %stored.fingerprint, "stored certificate");
        Ok(stored)
    }

    async fn set_active(&self, identity: IdentityId, active: bool) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.by_identity.get_mut(&identity).map_or(false, |record| {
            record.active = active;
            record.updated_at = Utc::now();
            true
        }))
    }

    async fn delete(&self, identity: IdentityId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.by_identity.remove(&identity) {
            Some(record) => {
                tables.by_fingerprint.remove(&record.fingerprint);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
