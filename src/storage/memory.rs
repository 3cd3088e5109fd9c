//! In-process tree store.
//!
//! Backs tests and dry runs, and is the working copy behind [`LocalStore`](super::LocalStore).

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::{TreeStore, tree};
use crate::utils::path_segments;

/// Tree store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a whole tree.
    pub fn from_value(root: Value) -> Self {
        Self {
            root: RwLock::new(tree::prune(root)),
        }
    }

    /// Copy of the whole tree (`null` when empty).
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let root = self.root.read().await;
        Ok(tree::get_at(&root, &path_segments(path)).cloned())
    }

    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        let mut root = self.root.write().await;
        tree::set_at(&mut root, &path_segments(path), value.clone());
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        let mut root = self.root.write().await;
        tree::update_at(&mut root, &path_segments(path), fields);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let mut root = self.root.write().await;
        tree::remove_at(&mut root, &path_segments(path));
        Ok(())
    }
}
