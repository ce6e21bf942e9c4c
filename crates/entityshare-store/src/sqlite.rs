//! SQLite implementation of the ShareStore trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Each grant is one row: the key columns are
//! indexed, the full record is kept as CBOR.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use entityshare_core::{AccessLevel, Grant, GranteeRef, ShareableRef};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{check_save, SaveResult, ShareStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteShareStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteShareStore {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened share store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {e}")),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

fn decode(record: Vec<u8>) -> Result<Grant> {
    Ok(Grant::from_bytes(&record)?)
}

fn parse_level(raw: &str) -> Result<AccessLevel> {
    Ok(raw.parse::<AccessLevel>()?)
}

#[async_trait]
impl ShareStore for SqliteShareStore {
    async fn save(&self, grant: &Grant) -> Result<SaveResult> {
        let grant = grant.clone();
        let record = grant.to_bytes()?;

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT access_level FROM entity_shares WHERE share_id = ?1",
                    params![grant.id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            let existing = existing.as_deref().map(parse_level).transpose()?;

            let current_owner: Option<(String, String)> = tx
                .query_row(
                    "SELECT grantee_type, grantee_id FROM entity_shares
                     WHERE shareable_type = ?1 AND shareable_id = ?2 AND access_level = 'owner'",
                    params![grant.shareable_type, grant.shareable_id.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let current_owner = current_owner
                .map(|(kind, id)| {
                    kind.parse()
                        .map(|kind| GranteeRef::new(kind, id))
                        .map_err(StoreError::from)
                })
                .transpose()?;

            check_save(&grant, existing, current_owner.as_ref())?;

            tx.execute(
                "INSERT INTO entity_shares (
                    share_id, shareable_type, shareable_id, grantee_type, grantee_id,
                    access_level, grantee_scope, created_at, updated_at, record
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(share_id) DO UPDATE SET
                    access_level = excluded.access_level,
                    grantee_scope = excluded.grantee_scope,
                    updated_at = excluded.updated_at,
                    record = excluded.record",
                params![
                    grant.id.as_bytes().as_slice(),
                    grant.shareable_type,
                    grant.shareable_id.as_str(),
                    grant.grantee.grantee_type().as_str(),
                    grant.grantee.id(),
                    grant.access_level.as_str(),
                    grant.grantee_scope.as_str(),
                    grant.created_at,
                    now_millis(),
                    record,
                ],
            )?;
            tx.commit()?;

            Ok(if existing.is_some() {
                SaveResult::Updated
            } else {
                SaveResult::Inserted
            })
        })
        .await
    }

    async fn delete(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<bool> {
        let shareable = shareable.clone();
        let grantee = grantee.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let level: Option<String> = tx
                .query_row(
                    "SELECT access_level FROM entity_shares
                     WHERE shareable_type = ?1 AND shareable_id = ?2
                       AND grantee_type = ?3 AND grantee_id = ?4",
                    params![
                        shareable.shareable_type,
                        shareable.shareable_id.as_str(),
                        grantee.grantee_type().as_str(),
                        grantee.id(),
                    ],
                    |row| row.get(0),
                )
                .optional()?;

            match level.as_deref().map(parse_level).transpose()? {
                None => Ok(false),
                Some(AccessLevel::Owner) => Err(StoreError::Invariant(format!(
                    "owner grant of {shareable} cannot be deleted"
                ))),
                Some(_) => {
                    tx.execute(
                        "DELETE FROM entity_shares
                         WHERE shareable_type = ?1 AND shareable_id = ?2
                           AND grantee_type = ?3 AND grantee_id = ?4",
                        params![
                            shareable.shareable_type,
                            shareable.shareable_id.as_str(),
                            grantee.grantee_type().as_str(),
                            grantee.id(),
                        ],
                    )?;
                    tx.commit()?;
                    Ok(true)
                }
            }
        })
        .await
    }

    async fn get(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<Option<Grant>> {
        let shareable = shareable.clone();
        let grantee = grantee.clone();

        self.blocking(move |conn| {
            let record: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM entity_shares
                     WHERE shareable_type = ?1 AND shareable_id = ?2
                       AND grantee_type = ?3 AND grantee_id = ?4",
                    params![
                        shareable.shareable_type,
                        shareable.shareable_id.as_str(),
                        grantee.grantee_type().as_str(),
                        grantee.id(),
                    ],
                    |row| row.get(0),
                )
                .optional()?;
            record.map(decode).transpose()
        })
        .await
    }

    async fn load(&self, shareable: &ShareableRef) -> Result<Vec<Grant>> {
        let shareable = shareable.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record FROM entity_shares
                 WHERE shareable_type = ?1 AND shareable_id = ?2
                 ORDER BY rowid",
            )?;
            let records = stmt
                .query_map(
                    params![shareable.shareable_type, shareable.shareable_id.as_str()],
                    |row| row.get::<_, Vec<u8>>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            records.into_iter().map(decode).collect()
        })
        .await
    }

    async fn count(&self, shareable: &ShareableRef) -> Result<usize> {
        let shareable = shareable.clone();

        self.blocking(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entity_shares
                 WHERE shareable_type = ?1 AND shareable_id = ?2",
                params![shareable.shareable_type, shareable.shareable_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }
}
