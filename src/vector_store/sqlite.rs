//! SQLite-backed vector store using the sqlite-vec extension.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::ffi::sqlite3_auto_extension;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use sqlite_vec::sqlite3_vec_init;
use tracing::info;

use super::models::{EmbeddingRecord, SearchResult};
use super::VectorStore;

const DB_FILE_NAME: &str = "textrag.db";

static VEC_EXTENSION: Once = Once::new();

/// Register sqlite-vec for every connection opened by this process.
fn ensure_vec_extension() {
    VEC_EXTENSION.call_once(|| unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Vector store backed by a single SQLite database inside the `--db`
/// directory: a `vec0` virtual table for embeddings (cosine distance) and a
/// companion table for texts and metadata, joined by rowid.
pub struct SqliteVectorStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open or create a store under the given directory.
    pub fn open(directory: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).with_context(|| {
            format!(
                "Failed to create database directory: {}",
                directory.display()
            )
        })?;

        ensure_vec_extension();

        let db_path = directory.join(DB_FILE_NAME);
        let connection = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_context(|| format!("Failed to open database at: {}", db_path.display()))?;

        // WAL keeps readers unblocked during ingestion batches.
        connection
            .prepare("PRAGMA journal_mode = WAL")?
            .query_map([], |_| Ok(()))?
            .for_each(drop);
        connection
            .prepare("PRAGMA synchronous = NORMAL")?
            .query_map([], |_| Ok(()))?
            .for_each(drop);

        let store = Self {
            db_path,
            connection: Arc::new(Mutex::new(connection)),
            dimensions,
        };
        store.create_schema()?;

        info!(path = %store.db_path.display(), dimensions, "Vector store opened");
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        ensure_vec_extension();

        let connection =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        let store = Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(connection)),
            dimensions,
        };
        store.create_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                vec_rowid INTEGER NOT NULL UNIQUE,
                text TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                message_count INTEGER NOT NULL,
                senders TEXT NOT NULL,
                model_name TEXT NOT NULL,
                embedded_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks \
                 USING vec0(embedding float[{}] distance_metric=cosine)",
                self.dimensions
            ),
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }
}

impl VectorStore for SqliteVectorStore {
    fn put(&self, record: EmbeddingRecord) -> Result<()> {
        if record.vector.len() != self.dimensions {
            bail!(
                "embedding for chunk {} has {} dimensions, store expects {}",
                record.id,
                record.vector.len(),
                self.dimensions
            );
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Replace-by-id keeps re-ingestion idempotent.
        let existing: Option<i64> = tx
            .query_row(
                "SELECT vec_rowid FROM chunks WHERE id = ?1",
                params![record.id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(rowid) = existing {
            tx.execute("DELETE FROM vec_chunks WHERE rowid = ?1", params![rowid])?;
            tx.execute("DELETE FROM chunks WHERE id = ?1", params![record.id])?;
        }

        let rowid: i64 = tx.query_row(
            "SELECT COALESCE(MAX(vec_rowid), 0) + 1 FROM chunks",
            [],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO vec_chunks (rowid, embedding) VALUES (?1, ?2)",
            params![rowid, vector_to_blob(&record.vector)],
        )?;

        tx.execute(
            "INSERT INTO chunks
                (id, vec_rowid, text, start_time, end_time, message_count,
                 senders, model_name, embedded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                rowid,
                record.text,
                record.metadata.start_time,
                record.metadata.end_time,
                record.metadata.message_count as i64,
                record.metadata.senders,
                record.model_name,
                record.embedded_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            bail!(
                "query vector has {} dimensions, store expects {}",
                query.len(),
                self.dimensions
            );
        }

        let conn = self.lock()?;

        let mut statement = conn.prepare(
            "SELECT c.id, c.text, c.start_time, c.end_time, c.message_count,
                    c.senders, v.distance
             FROM (
                 SELECT rowid, distance FROM vec_chunks
                 WHERE embedding MATCH ?1 AND k = ?2
                 ORDER BY distance
             ) v
             JOIN chunks c ON c.vec_rowid = v.rowid
             ORDER BY v.distance",
        )?;

        let results = statement
            .query_map(params![vector_to_blob(query), k as i64], |row| {
                Ok(SearchResult {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    start_time: row.get(2)?,
                    end_time: row.get(3)?,
                    message_count: row.get::<_, i64>(4)? as usize,
                    senders: row.get(5)?,
                    distance: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(results)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// sqlite-vec expects float32 vectors as little-endian blobs.
fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}
