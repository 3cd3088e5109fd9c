//! Local filesystem storage implementation.
//!
//! Works on a whole-database JSON export, the file the realtime database
//! console produces. Useful for rehearsing a reconciliation on a copy of
//! production data before running it against the live database.
//!
//! ## Storage Layout
//!
//! ```text
//! {local_path}            # the export, rewritten after every write
//! {local_path}.tmp        # transient, renamed over the export
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{MemoryStore, TreeStore};

/// Tree store persisted to a single JSON file.
pub struct LocalStore {
    file: PathBuf,
    tree: MemoryStore,
    flush_lock: Mutex<()>,
}

impl LocalStore {
    /// Open the export at `file`; a missing file starts an empty tree.
    pub async fn open(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let root = match tokio::fs::read(&file).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Value::Null,
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No database export at {}, starting empty", file.display());
                Value::Null
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        Ok(Self {
            file,
            tree: MemoryStore::from_value(root),
            flush_lock: Mutex::new(()),
        })
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write the current tree atomically (write to temp, then rename).
    async fn flush(&self) -> Result<()> {
        let _guard = self.flush_lock.lock().await;
        let snapshot = self.tree.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        self.ensure_dir().await?;
        let tmp = self.file.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.file).await?;
        Ok(())
    }
}

#[async_trait]
impl TreeStore for LocalStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.tree.get(path).await
    }

    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        self.tree.set(path, value).await?;
        self.flush().await
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        self.tree.update(path, fields).await?;
        self.flush().await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.tree.remove(path).await?;
        self.flush().await
    }
}
