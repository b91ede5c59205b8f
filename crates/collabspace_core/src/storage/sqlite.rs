//! SQLite-backed storage implementation for the local provider.
//!
//! This module provides a persistent storage backend using SQLite for the
//! workspace index, document snapshots and blobs.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::WorkspaceStorage;
use crate::error::Result;
use crate::types::{WorkspaceMeta, WorkspaceType};

/// SQLite-backed workspace storage.
///
/// # Thread Safety
///
/// The connection is wrapped in a `Mutex` for thread-safe access.
/// SQLite itself is used in serialized threading mode.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path.
    ///
    /// This will create the necessary tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or if schema
    /// initialization fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database for testing.
    ///
    /// Data is lost when the storage is dropped.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            -- Workspace index (creation order kept by `position`)
            CREATE TABLE IF NOT EXISTS workspaces (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                avatar TEXT,
                provider TEXT NOT NULL,
                is_publish INTEGER NOT NULL DEFAULT 0,
                workspace_type TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            -- Document snapshots (full CRDT state)
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                state BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Content-addressed blobs
            CREATE TABLE IF NOT EXISTS blobs (
                workspace_id TEXT NOT NULL,
                blob_id TEXT NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (workspace_id, blob_id)
            );
            "#,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

fn type_to_str(workspace_type: WorkspaceType) -> &'static str {
    match workspace_type {
        WorkspaceType::Local => "local",
        WorkspaceType::Cloud => "cloud",
    }
}

fn type_from_str(value: &str) -> WorkspaceType {
    match value {
        "cloud" => WorkspaceType::Cloud,
        _ => WorkspaceType::Local,
    }
}

impl WorkspaceStorage for SqliteStorage {
    fn load_doc(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let state = conn
            .query_row(
                "SELECT state FROM documents WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state)
    }

    fn save_doc(&self, id: &str, state: &[u8]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, state, updated_at) VALUES (?, ?, ?)",
            params![id, state, now],
        )?;
        Ok(())
    }

    fn delete_doc(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM documents WHERE id = ?", params![id])?;
        Ok(())
    }

    fn list_docs(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn load_index(&self) -> Result<Vec<WorkspaceMeta>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, avatar, provider, is_publish, workspace_type
             FROM workspaces ORDER BY position",
        )?;
        let metas = stmt
            .query_map([], |row| {
                Ok(WorkspaceMeta {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avatar: row.get(2)?,
                    provider: row.get(3)?,
                    is_publish: row.get::<_, i64>(4)? != 0,
                    workspace_type: type_from_str(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(metas)
    }

    fn save_meta(&self, meta: &WorkspaceMeta) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE workspaces
             SET name = ?, avatar = ?, provider = ?, is_publish = ?, workspace_type = ?
             WHERE id = ?",
            params![
                meta.name,
                meta.avatar,
                meta.provider,
                meta.is_publish as i64,
                type_to_str(meta.workspace_type),
                meta.id
            ],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO workspaces (id, name, avatar, provider, is_publish, workspace_type, position)
                 VALUES (?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM workspaces))",
                params![
                    meta.id,
                    meta.name,
                    meta.avatar,
                    meta.provider,
                    meta.is_publish as i64,
                    type_to_str(meta.workspace_type)
                ],
            )?;
        }
        Ok(())
    }

    fn delete_meta(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM workspaces WHERE id = ?", params![id])?;
        Ok(())
    }

    fn get_blob(&self, workspace_id: &str, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let data = conn
            .query_row(
                "SELECT data FROM blobs WHERE workspace_id = ? AND blob_id = ?",
                params![workspace_id, blob_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    fn put_blob(&self, workspace_id: &str, blob_id: &str, data: &[u8]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO blobs (workspace_id, blob_id, data) VALUES (?, ?, ?)",
            params![workspace_id, blob_id, data],
        )?;
        Ok(())
    }

    fn delete_blobs(&self, workspace_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM blobs WHERE workspace_id = ?",
            params![workspace_id],
        )?;
        Ok(())
    }

    fn delete_workspace(&self, id: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM blobs WHERE workspace_id = ?", params![id])?;
        tx.execute("DELETE FROM workspaces WHERE id = ?", params![id])?;
        tx.execute("DELETE FROM documents WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM workspaces; DELETE FROM documents; DELETE FROM blobs;",
        )?;
        Ok(())
    }
}
