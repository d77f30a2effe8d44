//! Service wiring.

use std::sync::Arc;

use provenance_ca::LocalCa;
use provenance_core::{CertificateStore, MemoryCertificateStore};
use provenance_enroll::{CertificateApi, EnrollmentService};
use provenance_manifest::{HttpManifestStorage, ManifestValidator, ProvenanceService};
use tracing::{debug, info};

use crate::{Config, Result};

/// Every service, sharing one certificate store and one CA.
#[derive(Clone)]
pub struct Provenance {
    pub ca: Arc<LocalCa>,
    pub store: Arc<dyn CertificateStore>,
    pub enrollment: EnrollmentService,
    pub api: CertificateApi,
    pub provenance: ProvenanceService,
}

impl Provenance {
    /// Open the configured CA key and certificate database.
    ///
    /// A missing CA key yields an ephemeral CA; run `provenance ca init`
    /// to create a persistent one. Without the `sqlite` feature
    /// certificates are kept in memory.
    pub fn open(config: &Config) -> Result<Self> {
        let key_path = config.ca_key_path()?;
        let ca = LocalCa::load_or_generate(Some(&key_path), config.ca.subject.clone())?;
        let store = open_store(config)?;
        Self::with_parts(config, ca, store)
    }

    /// Ephemeral CA and in-memory store, for tests and one-off checks.
    pub fn in_memory(config: &Config) -> Result<Self> {
        let ca = LocalCa::generate(config.ca.subject.clone())?;
        Self::with_parts(config, ca, Arc::new(MemoryCertificateStore::new()))
    }

    fn with_parts(config: &Config, ca: LocalCa, store: Arc<dyn CertificateStore>) -> Result<Self> {
        let ca = Arc::new(ca);
        let enrollment = EnrollmentService::new(store.clone(), ca.clone())
            .with_validity(config.ca.validity());

        let storage = HttpManifestStorage::new(config.download.timeout(), config.download.retry())?
            .with_max_bytes(config.manifest.max_manifest_bytes);
        let provenance = ProvenanceService::new(
            Arc::new(storage),
            ManifestValidator::new(config.manifest),
            store.clone(),
        );

        debug!(
            validity_days = config.ca.certificate_validity_days,
            max_manifest_bytes = config.manifest.max_manifest_bytes,
            "services ready"
        );

        Ok(Self {
            ca,
            store,
            api: CertificateApi::new(enrollment.clone()),
            enrollment,
            provenance,
        })
    }
}

#[cfg(feature = "sqlite")]
fn open_store(config: &Config) -> Result<Arc<dyn CertificateStore>> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = provenance_store::SqliteCertificateStore::open(&path)?;
    info!(path = %path.display(), "opened certificate database");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_store(_config: &Config) -> Result<Arc<dyn CertificateStore>> {
    info!("sqlite feature disabled, certificates are kept in memory");
    Ok(Arc::new(MemoryCertificateStore::new()))
}
