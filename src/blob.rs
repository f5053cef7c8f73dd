// Key-value blob stores used to persist serialized state

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Opaque string blobs addressed by key
pub trait BlobStore {
    /// Read the blob under `key`, `None` if never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the blob under `key`, replacing any previous value
    fn put(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete the blob under `key`; missing keys are not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Validate a blob key (it becomes a file name or a primary key)
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Blob key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Blob key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid blob key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.blobs.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.blobs.remove(key);
        Ok(())
    }
}

// ============================================================================
// Directory of files, one `<key>.json` per blob
// ============================================================================

#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (creating if needed) a blob directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create blob directory")?;
        Ok(Self { dir })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read blob {:?}", path))?;
        Ok(Some(content))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(key))
            .context("Failed to open blob lock file")?;

        // Exclusive lock so concurrent writers never interleave
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let path = self.blob_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        let written = write_synced(&tmp_path, value)
            .and_then(|()| fs::rename(&tmp_path, &path).context("Failed to replace blob file"));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!(path = ?tmp_path, error = ?cleanup, "Could not remove temporary blob file");
            }
            return Err(e);
        }

        debug!(key, bytes = value.len(), "Wrote blob file");

        // Lock is released when `lock` is dropped
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.blob_path(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove blob {:?}", path))?;
        }
        Ok(())
    }
}

fn write_synced(path: &Path, value: &str) -> Result<()> {
    let mut file = fs::File::create(path).context("Failed to create temporary blob file")?;
    file.write_all(value.as_bytes()).context("Failed to write temporary blob file")?;
    file.sync_all().context("Failed to sync temporary blob file")?;
    Ok(())
}

// ============================================================================
// SQLite table
// ============================================================================

pub struct SqliteBlobStore {
    db: Connection,
}

impl SqliteBlobStore {
    /// Open or create a SQLite database file holding blobs
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating blob schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;

        Ok(value)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.db.execute(
            "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, crate::now_ms()],
        )?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(())
    }
}
