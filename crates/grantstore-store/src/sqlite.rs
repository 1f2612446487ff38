//! SQLite implementation of the operational store

use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grantstore_domain::{
    DeviceFlowCode, ExpiredRecord, OperationalStore, PersistedGrant, RecordKind, RecordStore,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const GRANT_COLUMNS: &str =
    "key, type, subject_id, client_id, creation_time, expiration, consumed_time, data";

const DEVICE_CODE_COLUMNS: &str =
    "device_code, user_code, subject_id, client_id, creation_time, expiration, data";

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// SQLite-based implementation of the operational store
///
/// Timestamps are stored as nanoseconds since the Unix epoch, so a stored
/// record compares against a cutoff exactly as it does in memory. This
/// limits them to the years 1677 through 2262.
///
/// # Thread Safety
///
/// rusqlite is synchronous. Every operation runs on tokio's blocking pool
/// and holds the connection mutex only there, so a slow statement never
/// stalls the async workers.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use grantstore_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("grants.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("Task join error: {}", e)))?
    }
}

fn to_nanos(time: DateTime<Utc>) -> Result<i64, StoreError> {
    time.timestamp_nanos_opt()
        .ok_or_else(|| StoreError::InvalidData(format!("Timestamp out of range: {}", time)))
}

fn opt_to_nanos(time: Option<DateTime<Utc>>) -> Result<Option<i64>, StoreError> {
    time.map(to_nanos).transpose()
}

fn from_nanos(nanos: i64) -> Result<DateTime<Utc>, StoreError> {
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    // rem_euclid is always in 0..1e9
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SEC)).unwrap_or_default();
    DateTime::from_timestamp(secs, subsec)
        .ok_or_else(|| StoreError::InvalidData(format!("Timestamp out of range: {}", nanos)))
}

/// Map a timestamp conversion failure into a row error
fn conversion_error(idx: usize, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
}

fn column_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let nanos: i64 = row.get(idx)?;
    from_nanos(nanos).map_err(|e| conversion_error(idx, e))
}

fn column_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let nanos: Option<i64> = row.get(idx)?;
    nanos
        .map(|n| from_nanos(n).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn grant_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedGrant> {
    Ok(PersistedGrant {
        key: row.get(0)?,
        grant_type: row.get(1)?,
        subject_id: row.get(2)?,
        client_id: row.get(3)?,
        creation_time: column_time(row, 4)?,
        expiration: column_opt_time(row, 5)?,
        consumed_time: column_opt_time(row, 6)?,
        data: row.get(7)?,
    })
}

fn device_code_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceFlowCode> {
    Ok(DeviceFlowCode {
        device_code: row.get(0)?,
        user_code: row.get(1)?,
        subject_id: row.get(2)?,
        client_id: row.get(3)?,
        creation_time: column_time(row, 4)?,
        expiration: column_opt_time(row, 5)?,
        data: row.get(6)?,
    })
}

fn table(kind: RecordKind) -> (&'static str, &'static str) {
    match kind {
        RecordKind::Grants => ("persisted_grants", "key"),
        RecordKind::DeviceCodes => ("device_codes", "device_code"),
    }
}

#[async_trait]
impl OperationalStore for SqliteStore {
    type Error = StoreError;

    async fn query_expired(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ExpiredRecord>, Self::Error> {
        let cutoff = to_nanos(cutoff)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let records = match kind {
                RecordKind::Grants => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {GRANT_COLUMNS} FROM persisted_grants
                         WHERE expiration IS NOT NULL AND expiration <= ?1
                         ORDER BY expiration LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![cutoff, limit], grant_from_row)?;
                    let records = rows
                        .map(|r| r.map(ExpiredRecord::Grant))
                        .collect::<Result<Vec<_>, _>>()?;
                    records
                }
                RecordKind::DeviceCodes => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {DEVICE_CODE_COLUMNS} FROM device_codes
                         WHERE expiration IS NOT NULL AND expiration <= ?1
                         ORDER BY expiration LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![cutoff, limit], device_code_from_row)?;
                    let records = rows
                        .map(|r| r.map(ExpiredRecord::DeviceCode))
                        .collect::<Result<Vec<_>, _>>()?;
                    records
                }
            };
            Ok(records)
        })
        .await
    }

    async fn delete_by_keys(
        &self,
        kind: RecordKind,
        keys: &[String],
    ) -> Result<Vec<String>, Self::Error> {
        let (table, key_column) = table(kind);
        let requested = keys.len();
        let keys = keys.to_vec();

        let removed = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut removed = Vec::with_capacity(keys.len());
                {
                    let mut stmt =
                        tx.prepare(&format!("DELETE FROM {table} WHERE {key_column} = ?1"))?;
                    for key in keys {
                        if stmt.execute(params![&key])? > 0 {
                            removed.push(key);
                        }
                    }
                }
                tx.commit()?;
                Ok(removed)
            })
            .await?;

        if removed.len() < requested {
            tracing::debug!(
                kind = %kind,
                requested,
                removed = removed.len(),
                "some records were already gone"
            );
        }

        Ok(removed)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn store_grant(&self, grant: PersistedGrant) -> Result<(), Self::Error> {
        let creation_time = to_nanos(grant.creation_time)?;
        let expiration = opt_to_nanos(grant.expiration)?;
        let consumed_time = opt_to_nanos(grant.consumed_time)?;

        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO persisted_grants ({GRANT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    &grant.key,
                    &grant.grant_type,
                    &grant.subject_id,
                    &grant.client_id,
                    creation_time,
                    expiration,
                    consumed_time,
                    &grant.data,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_grant(&self, key: &str) -> Result<Option<PersistedGrant>, Self::Error> {
        let key = key.to_owned();
        self.with_conn(move |conn| {
            let grant = conn
                .query_row(
                    &format!("SELECT {GRANT_COLUMNS} FROM persisted_grants WHERE key = ?1"),
                    params![key],
                    grant_from_row,
                )
                .optional()?;
            Ok(grant)
        })
        .await
    }

    async fn remove_grant(&self, key: &str) -> Result<bool, Self::Error> {
        let key = key.to_owned();
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM persisted_grants WHERE key = ?1", params![key])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn store_device_code(&self, code: DeviceFlowCode) -> Result<(), Self::Error> {
        let creation_time = to_nanos(code.creation_time)?;
        let expiration = opt_to_nanos(code.expiration)?;

        self.with_conn(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM device_codes WHERE device_code = ?1",
                    params![&code.device_code],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            if exists {
                return Err(StoreError::Duplicate(code.device_code));
            }

            conn.execute(
                &format!(
                    "INSERT INTO device_codes ({DEVICE_CODE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    &code.device_code,
                    &code.user_code,
                    &code.subject_id,
                    &code.client_id,
                    creation_time,
                    expiration,
                    &code.data,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, Self::Error> {
        let device_code = device_code.to_owned();
        self.with_conn(move |conn| {
            let code = conn
                .query_row(
                    &format!(
                        "SELECT {DEVICE_CODE_COLUMNS} FROM device_codes WHERE device_code = ?1"
                    ),
                    params![device_code],
                    device_code_from_row,
                )
                .optional()?;
            Ok(code)
        })
        .await
    }

    async fn find_device_code_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, Self::Error> {
        let user_code = user_code.to_owned();
        self.with_conn(move |conn| {
            let code = conn
                .query_row(
                    &format!(
                        "SELECT {DEVICE_CODE_COLUMNS} FROM device_codes WHERE user_code = ?1
                         ORDER BY creation_time DESC LIMIT 1"
                    ),
                    params![user_code],
                    device_code_from_row,
                )
                .optional()?;
            Ok(code)
        })
        .await
    }

    async fn remove_device_code(&self, device_code: &str) -> Result<bool, Self::Error> {
        let device_code = device_code.to_owned();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM device_codes WHERE device_code = ?1",
                params![device_code],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn count(&self, kind: RecordKind) -> Result<usize, Self::Error> {
        let (table, _) = table(kind);
        self.with_conn(move |conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            usize::try_from(count).map_err(|e| StoreError::InvalidData(e.to_string()))
        })
        .await
    }
}
