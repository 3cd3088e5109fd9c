//! Storage abstractions for the realtime tree store.
//!
//! The application data is one JSON tree addressed by `/`-separated paths.
//! Every generation of the schema lives under its own top-level key:
//!
//! ```text
//! <root>/
//! ├── elearning/                      # current generation
//! │   ├── courses/<courseId>
//! │   │   ├── modules/<moduleId>
//! │   │   └── moduleIdMapping/<n>
//! │   ├── evaluations/<moduleId>/<userId>/attempts/<attemptId>
//! │   └── progress/<userId>/<courseId>/<moduleId>
//! └── Elearning/                      # legacy generation, same shapes
//! ```
//!
//! Writes are atomic per path only. Callers go through [`DualWriteStore`],
//! which owns the namespaces and mirrors writes into the legacy tree.

pub mod dual;
pub mod firebase;
pub mod local;
pub mod memory;
pub mod tree;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{StoreBackend, StoreConfig};

// Re-export for convenience
pub use dual::{DualWriteStore, Namespace};
pub use firebase::FirebaseStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Path-addressed JSON tree store.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Fetch the value at `path`, `None` when absent.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Replace the value at `path`. Setting `null` removes it.
    async fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Merge `fields` into the node at `path`; keys may themselves be sub-paths.
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()>;

    /// Remove the value at `path`; parents left empty disappear.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Child keys of the node at `path`.
    async fn child_keys(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .get(path)
            .await?
            .map(|value| tree::child_keys(&value))
            .unwrap_or_default())
    }
}

/// Build the configured store backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TreeStore>> {
    let store: Arc<dyn TreeStore> = match config.backend {
        StoreBackend::Firebase => {
            let client = reqwest::Client::builder()
                .user_agent(&config.user_agent)
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;
            Arc::new(FirebaseStore::new(
                client,
                &config.database_url,
                config.auth_token.clone(),
            )?)
        }
        StoreBackend::Local => Arc::new(LocalStore::open(&config.local_path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Relative paths inside a namespace.
pub mod paths {
    pub const COURSES: &str = "courses";

    pub fn course(course_id: &str) -> String {
        format!("{}/{}", COURSES, course_id)
    }

    pub fn modules(course_id: &str) -> String {
        format!("{}/{}/modules", COURSES, course_id)
    }

    pub fn module(course_id: &str, module_id: &str) -> String {
        format!("{}/{}/modules/{}", COURSES, course_id, module_id)
    }

    pub fn module_id_mapping(course_id: &str) -> String {
        format!("{}/{}/moduleIdMapping", COURSES, course_id)
    }

}
