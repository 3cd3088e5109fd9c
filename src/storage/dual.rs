//! Namespace-aware access with the dual-write policy.
//!
//! Reads name the namespace they target. Writes always go to the primary
//! namespace and, when dual writing is on, are mirrored into the legacy one.
//! The mirror is best-effort: a failed legacy write is logged and skipped.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::NamespaceConfig;
use crate::storage::TreeStore;
use crate::utils::join_path;

/// Schema generation a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Primary,
    Legacy,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Primary => f.write_str("primary"),
            Namespace::Legacy => f.write_str("legacy"),
        }
    }
}

/// Store adapter owning the primary/legacy namespaces.
#[derive(Clone)]
pub struct DualWriteStore {
    store: Arc<dyn TreeStore>,
    primary: String,
    legacy: Option<String>,
    dual_write: bool,
}

impl DualWriteStore {
    pub fn new(store: Arc<dyn TreeStore>, config: &NamespaceConfig) -> Self {
        Self {
            store,
            primary: config.primary.trim().to_string(),
            legacy: config.legacy_namespace().map(str::to_string),
            dual_write: config.dual_write,
        }
    }

    /// Namespaces to search, primary first.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut namespaces = vec![Namespace::Primary];
        if self.legacy.is_some() {
            namespaces.push(Namespace::Legacy);
        }
        namespaces
    }

    /// Absolute store path of `relative` inside `namespace`.
    pub fn full_path(&self, namespace: Namespace, relative: &str) -> Option<String> {
        let prefix = match namespace {
            Namespace::Primary => Some(self.primary.as_str()),
            Namespace::Legacy => self.legacy.as_deref(),
        }?;
        Some(join_path(&[prefix, relative]))
    }

    /// Read from one namespace; a disabled namespace reads as absent.
    pub async fn read(&self, namespace: Namespace, relative: &str) -> Result<Option<Value>> {
        match self.full_path(namespace, relative) {
            Some(path) => self.store.get(&path).await,
            None => Ok(None),
        }
    }

    /// First namespace holding a value at `relative`, primary first.
    pub async fn read_first(&self, relative: &str) -> Result<Option<(Namespace, Value)>> {
        for namespace in self.namespaces() {
            if let Some(value) = self.read(namespace, relative).await? {
                return Ok(Some((namespace, value)));
            }
        }
        Ok(None)
    }

    /// Child keys in one namespace.
    pub async fn keys(&self, namespace: Namespace, relative: &str) -> Result<Vec<String>> {
        match self.full_path(namespace, relative) {
            Some(path) => self.store.child_keys(&path).await,
            None => Ok(Vec::new()),
        }
    }

    /// Full replace in the primary namespace, mirrored to legacy.
    pub async fn set(&self, relative: &str, value: &Value) -> Result<()> {
        for (namespace, path) in self.write_targets(relative) {
            let result = self.store.set(&path, value).await;
            self.settle(namespace, &path, result)?;
        }
        Ok(())
    }

    /// Partial merge in the primary namespace, mirrored to legacy.
    pub async fn update(&self, relative: &str, fields: &Map<String, Value>) -> Result<()> {
        for (namespace, path) in self.write_targets(relative) {
            let result = self.store.update(&path, fields).await;
            self.settle(namespace, &path, result)?;
        }
        Ok(())
    }

    /// Removal in the primary namespace, mirrored to legacy.
    pub async fn remove(&self, relative: &str) -> Result<()> {
        for (namespace, path) in self.write_targets(relative) {
            let result = self.store.remove(&path).await;
            self.settle(namespace, &path, result)?;
        }
        Ok(())
    }

    fn write_targets(&self, relative: &str) -> Vec<(Namespace, String)> {
        let mut targets = vec![(
            Namespace::Primary,
            join_path(&[self.primary.as_str(), relative]),
        )];
        if self.dual_write {
            if let Some(path) = self.full_path(Namespace::Legacy, relative) {
                targets.push((Namespace::Legacy, path));
            }
        }
        targets
    }

    /// Primary failures propagate; legacy mirror failures are only logged.
    fn settle(&self, namespace: Namespace, path: &str, result: Result<()>) -> Result<()> {
        match (namespace, result) {
            (_, Ok(())) => Ok(()),
            (Namespace::Primary, Err(e)) => Err(e),
            (Namespace::Legacy, Err(e)) => {
                log::warn!("Legacy mirror write to {} failed: {}", path, e);
                Ok(())
            }
        }
    }
}
