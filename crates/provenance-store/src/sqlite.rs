//! SQLite implementation of the certificate store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provenance_core::{
    CertificateStore, Fingerprint, IdentityId, NewCertificate, StoreError, UserCertificate,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_certificates (
    identity_id     TEXT    NOT NULL UNIQUE,
    certificate_der BLOB    NOT NULL,
    certificate_pem TEXT    NOT NULL,
    public_key_pem  TEXT    NOT NULL,
    fingerprint     BLOB    NOT NULL UNIQUE,
    active          BOOLEAN NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL
);
";

const SELECT_COLUMNS: &str = "SELECT identity_id, certificate_der, certificate_pem, \
     public_key_pem, fingerprint, active, created_at, updated_at FROM user_certificates";

/// A [`CertificateStore`] persisted in a SQLite database.
///
/// Calls run on tokio's blocking pool; the connection is shared behind a
/// mutex.
#[derive(Clone)]
pub struct SqliteCertificateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCertificateStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(backend)?;
        info!(path = %path.display(), "opened certificate database");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend(String::from("connection mutex poisoned")))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Translate a unique-constraint failure into the matching conflict.
fn insert_error(err: rusqlite::Error, record: &NewCertificate) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            let message = message.as_deref().unwrap_or_default();
            if message.contains("identity_id") {
                return StoreError::IdentityConflict(record.identity_id);
            }
            if message.contains("fingerprint") {
                return StoreError::FingerprintConflict(record.fingerprint);
            }
        }
    }
    backend(err)
}

struct RawRow {
    identity_id: String,
    certificate_der: Vec<u8>,
    certificate_pem: String,
    public_key_pem: String,
    fingerprint: Vec<u8>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_id: row.get(0)?,
            certificate_der: row.get(1)?,
            certificate_pem: row.get(2)?,
            public_key_pem: row.get(3)?,
            fingerprint: row.get(4)?,
            active: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<RawRow> for UserCertificate {
    type Error = StoreError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        let identity_id: IdentityId = raw
            .identity_id
            .parse()
            .map_err(|e| StoreError::Backend(format!("corrupt identity_id: {e}")))?;
        let fingerprint: [u8; 32] = raw.fingerprint.try_into().map_err(|v: Vec<u8>| {
            StoreError::Backend(format!("corrupt fingerprint of {} bytes", v.len()))
        })?;

        Ok(Self {
            identity_id,
            certificate_der: raw.certificate_der,
            certificate_pem: raw.certificate_pem,
            public_key_pem: raw.public_key_pem,
            fingerprint: Fingerprint::from_bytes(fingerprint),
            active: raw.active,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

fn find_one(
    conn: &Connection,
    clause: &str,
    param: &dyn rusqlite::ToSql,
) -> Result<Option<UserCertificate>, StoreError> {
    let sql = format!("{SELECT_COLUMNS} WHERE {clause} = ?1");
    conn.query_row(&sql, [param], RawRow::read)
        .optional()
        .map_err(backend)?
        .map(UserCertificate::try_from)
        .transpose()
}

#[async_trait]
impl CertificateStore for SqliteCertificateStore {
    async fn find_by_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<UserCertificate>, StoreError> {
        debug!(identity = %identity, "looking up certificate by identity");
        self.run(move |conn| find_one(conn, "identity_id", &identity.to_string()))
            .await
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<UserCertificate>, StoreError> {
        debug!(fingerprint = %fingerprint, "looking up certificate by fingerprint");
        let key = fingerprint.as_bytes().to_vec();
        self.run(move |conn| find_one(conn, "fingerprint", &key)).await
    }

    async fn insert(&self, record: NewCertificate) -> Result<UserCertificate, StoreError> {
        self.run(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO user_certificates (identity_id, certificate_der, certificate_pem, \
                 public_key_pem, fingerprint, active, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    record.identity_id.to_string(),
                    record.certificate_der,
                    record.certificate_pem,
                    record.public_key_pem,
                    record.fingerprint.as_bytes().as_slice(),
                    record.active,
                    now,
                ],
            )
            .map_err(|e| insert_error(e, &record))?;

            Ok(UserCertificate::from_new(record, now))
        })
        .await
    }

    async fn set_active(&self, identity: IdentityId, active: bool) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE user_certificates SET active = ?1, updated_at = ?2 WHERE identity_id = ?3",
                    params![active, Utc::now(), identity.to_string()],
                )
                .map_err(backend)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete(&self, identity: IdentityId) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "DELETE FROM user_certificates WHERE identity_id = ?1",
                    params![identity.to_string()],
                )
                .map_err(backend)?;
            Ok(changed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(identity: IdentityId, der: &[u8]) -> NewCertificate {
        NewCertificate {
            identity_id: identity,
            certificate_der: der.to_vec(),
            certificate_pem: String::from("-----BEGIN CERTIFICATE-----"),
            public_key_pem: String::from("-----BEGIN PUBLIC KEY-----"),
            fingerprint: Fingerprint::of_der(der),
            active: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = SqliteCertificateStore::open_in_memory().unwrap();
        let id = IdentityId::new();
        let stored = store.insert(new_record(id, b"der-a")).await.unwrap();

        let by_id = store.find_by_identity(id).await.unwrap().unwrap();
        assert_eq!(by_id.fingerprint, stored.fingerprint);
        assert_eq!(by_id.certificate_der, b"der-a");
        assert!(!by_id.active);

        let by_fp = store
            .find_by_fingerprint(&stored.fingerprint)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_fp.identity_id, id);

        assert!(store
            .find_by_fingerprint(&Fingerprint::of_der(b"other"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unique_constraints_map_to_conflicts() {
        let store = SqliteCertificateStore::open_in_memory().unwrap();
        let id = IdentityId::new();
        store.insert(new_record(id, b"der-a")).await.unwrap();

        let err = store.insert(new_record(id, b"der-b")).await.unwrap_err();
        assert_eq!(err, StoreError::IdentityConflict(id));

        let err = store
            .insert(new_record(IdentityId::new(), b"der-a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FingerprintConflict(_)));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let store = SqliteCertificateStore::open_in_memory().unwrap();
        let id = IdentityId::new();
        store.insert(new_record(id, b"der-a")).await.unwrap();

        assert!(store.set_active(id, true).await.unwrap());
        assert!(store.find_by_identity(id).await.unwrap().unwrap().active);
        assert!(!store.set_active(IdentityId::new(), true).await.unwrap());

        assert!(store.delete(id).await.unwrap());
        assert!(store.find_by_identity(id).await.unwrap().is_none());

        // Revoked identities may enroll again.
        store.insert(new_record(id, b"der-c")).await.unwrap();
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certs.db");
        let id = IdentityId::new();

        {
            let store = SqliteCertificateStore::open(&path).unwrap();
            store.insert(new_record(id, b"der-a")).await.unwrap();
        }

        let store = SqliteCertificateStore::open(&path).unwrap();
        assert!(store.find_by_identity(id).await.unwrap().is_some());
    }
}
