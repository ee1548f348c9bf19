use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::identity::domain::identity_store::{IdentityRecord, IdentityStore, StoreError};
use crate::shared::frame::Frame;

use super::image_codec::{decode_png, encode_png};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    image BLOB NOT NULL
)";

/// Identity store backed by a single SQLite `users` table.
///
/// Reference crops are stored as PNG blobs so they decode back to the
/// exact pixels that were captured.
pub struct SqliteIdentityStore {
    conn: Option<Connection>,
    location: String,
}

impl SqliteIdentityStore {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories on demand.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let location = path.display().to_string();
        let fail = |reason: String| StoreError::Open {
            path: location.clone(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| fail(e.to_string()))?;
        Self::with_connection(conn, location)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".into(),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, ":memory:".into())
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self, StoreError> {
        conn.execute(CREATE_USERS_TABLE, [])
            .map_err(|e| StoreError::Open {
                path: location.clone(),
                reason: e.to_string(),
            })?;
        log::debug!("Identity store ready at {location}");
        Ok(Self {
            conn: Some(conn),
            location,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Every stored record in insertion order.
    pub fn records(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT id, username, image FROM users ORDER BY id")
            .map_err(query_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(query_error)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, blob) = row.map_err(query_error)?;
            records.push(IdentityRecord {
                id,
                name,
                image: decode_png(&blob)?,
            });
        }
        Ok(records)
    }

    fn connection(&self) -> Result<&Connection, StoreError> {
        self.conn
            .as_ref()
            .ok_or_else(|| StoreError::Query(format!("{} is closed", self.location)))
    }
}

fn query_error(e: rusqlite::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

impl IdentityStore for SqliteIdentityStore {
    fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .connection()?
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(query_error)?;
        Ok(n as usize)
    }

    fn save(&mut self, name: &str, image: &Frame) -> Result<(), StoreError> {
        let blob = encode_png(image)?;
        self.connection()?
            .execute(
                "INSERT INTO users (username, image) VALUES (?1, ?2)",
                params![name, blob],
            )
            .map_err(query_error)?;
        log::info!(
            "Saved {}x{} reference for '{name}'",
            image.width(),
            image.height()
        );
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Frame>, StoreError> {
        let blob: Option<Vec<u8>> = self
            .connection()?
            .query_row(
                "SELECT image FROM users WHERE username = ?1 ORDER BY id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;
        blob.map(|bytes| decode_png(&bytes)).transpose()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| query_error(e))?;
        log::debug!("Closed identity store at {}", self.location);
        Ok(())
    }
}
